pub mod filter;
pub mod models;
pub mod query;
pub mod refresh;
pub mod registry;

pub use filter::{LanguageFilter, SearchData, SortOrder, language_catalog, project};
pub use models::{
    ExtraInfo, ListKind, PING_UNREACHABLE, Player, RuleSet, ServerAddr, ServerRecord,
};
pub use query::{QueryEngine, QueryMode};
pub use refresh::refresh_all;
pub use registry::ServerRegistry;
