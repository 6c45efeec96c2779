/*!
# Template Index

In-memory, concurrently readable mirror of VM templates and the facet
queries served on top of it.

Templates carry their classification as boolean labels such as
`os.template.cnv.io/centos7.0=true`. The index decodes those labels into
facets (`os`, `workload`, `size`), summarizes the distinct values of a facet
through pluggable [`Ledger`]s, and describes the templates matching a set of
facet filters.

## Example

```rust
use std::sync::Arc;
use tindex_core::{FilterOptions, JsonLedger, Template, TemplateIndex};

let index = TemplateIndex::new();
index.register_ledger("os", Arc::new(JsonLedger::new("os")));

let template = Template::builder("centos7-generic-small")
    .label("os.template.cnv.io/centos7.0", "true")
    .label("workload.template.cnv.io/generic", "true")
    .build();
index.bulk_load(vec![template]).ok();

let summaries = index.summarize_by("os").unwrap_or_default();
assert_eq!(summaries[0].id, "centos7.0");

let descriptions = index.describe_by(&FilterOptions::new().with("workload", "generic"));
assert_eq!(descriptions.len(), 1);
```
*/

mod describe;
mod error;
mod index;
pub mod labels;
mod ledger;
mod string_set;
mod template;

pub use describe::{Description, FACET_KEYS, FilterOptions, describe};
pub use error::{IndexError, Result};
pub use index::{TemplateEvent, TemplateIndex};
pub use ledger::{JsonLedger, Ledger, LedgerSpec, Summary, default_ledger_specs, register_ledgers};
pub use string_set::StringSet;
pub use template::{ObjectMeta, Template, TemplateBuilder};
