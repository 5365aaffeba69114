mod codec;
mod models;
mod post_query;
mod post_storage;
mod sqlite;

pub use self::{
    models::{
        DEFAULT_CATEGORY, EmbeddedMedia, MediaKind, MediaPosition, NewPost, Patch, Post,
        PostPatch,
    },
    post_query::{Candidate, PostQuery},
    post_storage::PostStorage,
    sqlite::{Db, connect, connect_memory, migrate},
};
