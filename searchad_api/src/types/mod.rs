mod competition;
pub use self::competition::CompetitionLevel;

mod keyword;
pub use self::keyword::{KeywordStat, KeywordToolResponse, WireNumber};
