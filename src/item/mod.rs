/// This module provides line-oriented text file readers and writers.
pub mod text;
