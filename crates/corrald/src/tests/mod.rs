//! Behavioural test suites for the server.

mod behaviour;
mod support;
