mod draft;

pub use self::draft::{Content, Draft, FrontMatter, NoContent};
