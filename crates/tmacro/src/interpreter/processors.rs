//! Ordered pre- and post-processing pipelines.

use std::fmt;
use std::sync::Arc;

use bon::Builder;
use tracing::debug;

use crate::interpreter::env::Environment;

/// A text transformation run before or after resolution.
pub type Processor = Arc<dyn Fn(&str, &Environment) -> String + Send + Sync>;

/// Wrap a closure as a [`Processor`]. Keep the returned handle to remove it
/// later.
pub fn processor<F>(f: F) -> Processor
where
    F: Fn(&str, &Environment) -> String + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordering and labelling for a registered processor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct ProcessorOptions {
    /// Lower runs first. Ties run in registration order.
    #[builder(default)]
    pub priority: i32,
    /// Free-form label used in logs.
    #[builder(into, default)]
    pub source: String,
}

#[derive(Clone)]
struct Entry {
    processor: Processor,
    options: ProcessorOptions,
    seq: usize,
}

/// Processors sorted by priority, then registration order.
#[derive(Clone, Default)]
pub struct ProcessorPipeline {
    entries: Vec<Entry>,
    next_seq: usize,
}

fn same_processor(a: &Processor, b: &Processor) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl ProcessorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, processor: Processor, options: ProcessorOptions) {
        self.entries.push(Entry {
            processor,
            options,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.entries
            .sort_by_key(|entry| (entry.options.priority, entry.seq));
    }

    /// Remove every registration of this exact processor handle.
    pub fn remove(&mut self, processor: &Processor) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !same_processor(&entry.processor, processor));
        self.entries.len() != before
    }

    pub fn run(&self, input: &str, env: &Environment) -> String {
        let mut text = input.to_string();
        for entry in &self.entries {
            text = (entry.processor)(&text, env);
            debug!(
                source = %entry.options.source,
                priority = entry.options.priority,
                "processor ran"
            );
        }
        text
    }

    /// Labels in run order.
    pub fn sources(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.options.source.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ProcessorPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.sources()).finish()
    }
}
