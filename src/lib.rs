// otlp2es - OTLP export requests to search-index bulk bodies
//
// Decodes OTLP protobuf export requests and writes every signal as an
// action line plus document, encoded with the configured mapping mode.

pub mod convert;
mod init;

pub use convert::{ConvertStats, Converter, SignalType};
pub use init::init_tracing;
