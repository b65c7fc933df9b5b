//! # deskstate-cache
//!
//! 화면 시맨틱 상태의 권위 있는 사본.
//! 요소/창 집합을 보관하고 갱신마다 diff를 계산하며,
//! ID/레이블/좌표/종류 조회와 복합 필터 질의에 답한다.
//!
//! 어떤 연산도 실패하지 않는다. 찾지 못한 대상은 `None` 또는 빈 결과다.

pub mod cache;
pub mod diff;
pub mod fuzzy;
pub mod history;
pub mod query;
pub mod shared;
pub mod stats;
pub mod store;

pub use cache::{IncrementalUpdate, RemovalOutcome, UpdateOutcome, VisualStateCache};
pub use query::ElementQuery;
pub use shared::SharedVisualCache;
pub use stats::{CacheStats, CacheSummary};
