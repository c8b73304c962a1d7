mod generator;
mod http;
mod mix;
mod stats;

pub use generator::{Generator, GeneratorConfig, ProgressFn, ProgressUpdate};
pub use http::{Error, HttpClient, HttpRequest, HttpResponse, HttpTransportErrorKind, Result};
pub use mix::{MixError, RequestKind, RequestMix};
pub use stats::{KindSummary, RunStats, RunSummary};
