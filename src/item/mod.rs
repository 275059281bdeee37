/// This module provides the delimited-text item readers and writers.
pub mod csv;
