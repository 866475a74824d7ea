//! Paging, ordering and text matching for the read layer.
//!
//! Both storage backends consume the same types: the Postgres backend renders
//! them to SQL, the in-memory backend applies them to iterators.

pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use filter_order::{AnswerSort, FilterOrder, SavedQuestionSort};
pub use filter_where::TextSearch;
pub use types::{FilterOrderInfo, Pagination, SortDirection};
