pub mod adapters;
pub mod redis_store;
pub mod transport;
pub mod writer;

pub use adapters::{GupyAdapter, IndeedAdapter, LinkedInAdapter, SourceKind, registry};
pub use redis_store::RedisStore;
pub use transport::{ReqwestTransport, TransportOptions};
pub use writer::{ConsoleWriter, CsvWriter, DiscordWriter, JsonWriter, TelegramWriter};
