/// Reader and writer abstractions shared by every item source and sink.
pub mod item;
