//! Behavioural scenarios for snapshot, clone and delete workflows.

mod lifecycle;
