/// Reader and writer traits implemented by every codec front end.
pub mod item;

/// Dialect and policy options.
pub mod options;

/// Optional read/write observers.
pub mod handlers;

/// Column definitions and the record schema.
pub mod schema;

/// Line tokenizer.
pub mod tokenizer;

/// Row filter deciding which lines are decoded.
pub mod filter;

/// Record decode/encode.
pub mod mapper;

/// IO-free read state machine and write sequencer.
pub mod engine;
