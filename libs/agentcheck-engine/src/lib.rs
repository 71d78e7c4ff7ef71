pub mod catalog;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod store;


pub use engine::{AgentInvoker, AgentReply, Credentials, InvocationRequest, OpenRouterEngine};
pub use error::{ExecutorError, ProviderError, StoreError};
pub use evaluator::{PatternScorer, Scorer};
pub use executor::{ExecutorSettings, TestExecutor};
pub use store::{ExecutionStore, MemoryStore, RedisStore};
