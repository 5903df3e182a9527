//! Integration tests for the repoman binary
//!
//! Each test builds a throwaway workspace next to a directory of bare git
//! repositories that stand in for the package remotes.

mod test_checkout;
mod test_release;
