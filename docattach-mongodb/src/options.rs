//! Conversions from docattach option types to the driver's.

use std::{collections::HashMap, time::Duration};

use bson::Bson;
use mongodb::{
    IndexModel,
    options::{
        ClientOptions, FindOptions as MongoFindOptions, IndexOptions as MongoIndexOptions,
        InsertManyOptions,
    },
};

use docattach_core::options::{FindOptions, IndexKeys, IndexOptions, InsertOptions};

pub(crate) fn find_options(options: FindOptions) -> MongoFindOptions {
    let mut converted = MongoFindOptions::default();

    converted.projection = options.projection;
    converted.sort = options.sort;
    converted.skip = options.skip;
    converted.limit = options.limit;
    converted.batch_size = options.batch_size;

    converted
}

pub(crate) fn insert_options(options: InsertOptions) -> InsertManyOptions {
    let mut converted = InsertManyOptions::default();

    converted.ordered = options.ordered;
    converted.bypass_document_validation = options.bypass_document_validation;

    converted
}

pub(crate) fn index_model(keys: &IndexKeys, options: IndexOptions) -> IndexModel {
    let mut converted = MongoIndexOptions::default();

    converted.name = options.name;
    converted.unique = options.unique;
    converted.sparse = options.sparse;
    converted.background = options.background;
    converted.expire_after = options.expire_after;

    IndexModel::builder()
        .keys(keys.to_document())
        .options(converted)
        .build()
}

/// Applies the connect and server-selection bounds to parsed client options.
pub(crate) fn bound_client(options: &mut ClientOptions, timeout: Duration, app_name: Option<&str>) {
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);

    if let Some(app_name) = app_name {
        options.app_name = Some(app_name.to_string());
    }
}

/// Inserted identifiers in input order.
pub(crate) fn ordered_ids(inserted: HashMap<usize, Bson>) -> Vec<Bson> {
    let mut ids: Vec<(usize, Bson)> = inserted.into_iter().collect();
    ids.sort_by_key(|(index, _)| *index);

    ids.into_iter().map(|(_, id)| id).collect()
}
