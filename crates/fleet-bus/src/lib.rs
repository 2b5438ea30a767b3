//! `fleet-bus` — an in-process topic exchange.
//!
//! # Why this exists
//!
//! The simulator, dispatcher and external viewers share nothing but a
//! topic-routed message stream.  This crate gives them the AMQP shape —
//! a named exchange, per-consumer queues bound by routing-key pattern,
//! at-least-once delivery — without a broker process, so a whole run can be
//! pumped deterministically inside one test.
//!
//! # Delivery model
//!
//! `publish` copies the message into every queue whose binding pattern
//! matches the routing key; per-producer FIFO order is preserved per queue.
//! Consumers `drain()` their queue when they are ready to handle messages —
//! the pump model used by the run harness.  A message is gone once drained;
//! handler failures are the consumer's to log (malformed payloads are
//! acknowledged and dropped, never requeued).
//!
//! Queues are `parking_lot::Mutex`-guarded so handles can be held by
//! independently driven components.

pub mod exchange;


pub use exchange::{BusConsumer, TopicExchange};
