//! Topic exchange, bindings and consumer queues.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

// ── Pattern ───────────────────────────────────────────────────────────────────

/// One parsed routing-key pattern.  AMQP topic semantics on dot-separated
/// segments: `*` matches exactly one segment, `#` matches zero or more.
#[derive(Clone, Debug)]
struct Pattern(Vec<Segment>);

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Literal(String),
    Star,
    Hash,
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        Pattern(
            pattern
                .split('.')
                .map(|seg| match seg {
                    "*" => Segment::Star,
                    "#" => Segment::Hash,
                    lit => Segment::Literal(lit.to_owned()),
                })
                .collect(),
        )
    }

    fn matches(&self, key: &str) -> bool {
        let segs: Vec<&str> = key.split('.').collect();
        matches_at(&self.0, &segs)
    }
}

fn matches_at(pattern: &[Segment], key: &[&str]) -> bool {
    match pattern.first() {
        None => key.is_empty(),
        Some(Segment::Hash) => {
            // `#` absorbs zero or more segments.
            (0..=key.len()).any(|skip| matches_at(&pattern[1..], &key[skip..]))
        }
        Some(Segment::Star) => !key.is_empty() && matches_at(&pattern[1..], &key[1..]),
        Some(Segment::Literal(lit)) => {
            key.first() == Some(&lit.as_str()) && matches_at(&pattern[1..], &key[1..])
        }
    }
}

// ── Exchange ──────────────────────────────────────────────────────────────────

type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;

struct Binding {
    queue_name: String,
    patterns: Vec<Pattern>,
    queue: Queue,
}

struct ExchangeState {
    bindings: Vec<Binding>,
    unroutable: u64,
}

/// A durable-topology topic exchange shared by all components of a process.
///
/// Cloning the handle is cheap; all clones publish into the same exchange.
#[derive(Clone)]
pub struct TopicExchange {
    name: Arc<str>,
    state: Arc<Mutex<ExchangeState>>,
}

impl TopicExchange {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(ExchangeState {
                bindings: Vec::new(),
                unroutable: 0,
            })),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare `queue_name` bound to `patterns` and return its consumer
    /// handle.  Each call creates a fresh queue, mirroring one declared
    /// queue per consumer role.
    pub fn bind(&self, queue_name: &str, patterns: &[&str]) -> BusConsumer {
        let queue: Queue = Arc::new(Mutex::new(VecDeque::new()));
        let binding = Binding {
            queue_name: queue_name.to_owned(),
            patterns: patterns.iter().map(|p| Pattern::parse(p)).collect(),
            queue: Arc::clone(&queue),
        };
        self.state.lock().bindings.push(binding);
        BusConsumer {
            queue_name: queue_name.to_owned(),
            queue,
        }
    }

    /// Route `body` to every queue bound to a matching pattern.  Returns the
    /// number of queues that received a copy.
    pub fn publish(&self, routing_key: &str, body: &[u8]) -> usize {
        let mut state = self.state.lock();
        let mut delivered = 0;
        for binding in &state.bindings {
            if binding.patterns.iter().any(|p| p.matches(routing_key)) {
                binding.queue.lock().push_back(body.to_vec());
                delivered += 1;
            }
        }
        if delivered == 0 {
            state.unroutable += 1;
            debug!(exchange = %self.name, routing_key, "unroutable message dropped");
        }
        delivered
    }

    /// Messages published with no matching binding (dropped, counted).
    pub fn unroutable(&self) -> u64 {
        self.state.lock().unroutable
    }

    /// Total messages currently queued across all bindings.
    pub fn depth(&self) -> usize {
        self.state
            .lock()
            .bindings
            .iter()
            .map(|b| b.queue.lock().len())
            .sum()
    }
}

impl std::fmt::Debug for TopicExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicExchange")
            .field("name", &self.name)
            .field("depth", &self.depth())
            .finish()
    }
}

// ── Consumer ──────────────────────────────────────────────────────────────────

/// Handle to one bound queue.  FIFO per producer; messages are removed on
/// drain (the consumer owns ack semantics from there).
pub struct BusConsumer {
    queue_name: String,
    queue: Queue,
}

impl BusConsumer {
    #[inline]
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Remove and return every queued message, in arrival order.
    pub fn drain(&self) -> Vec<Vec<u8>> {
        self.queue.lock().drain(..).collect()
    }

    /// Remove and return the oldest message, if any.
    pub fn pop(&self) -> Option<Vec<u8>> {
        self.queue.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl std::fmt::Debug for BusConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusConsumer")
            .field("queue", &self.queue_name)
            .field("len", &self.len())
            .finish()
    }
}
