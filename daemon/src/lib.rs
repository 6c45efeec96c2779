//! HTTP front end of the template index.
//!
//! | route                                   | answer                         |
//! |-----------------------------------------|--------------------------------|
//! | `GET /oses`, `/workloads`, `/sizes`     | facet summaries                |
//! | `GET /templates?os=&workload=&size=`    | descriptions of the matches    |
//! | `GET /health`                           | template count and ledger keys |

mod daemon;

pub use daemon::{HealthStatus, router, serve, serve_listener};
