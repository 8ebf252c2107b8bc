//! Integration tests for docmeta-graph
//!
//! Uses wiremock to simulate the Microsoft Graph API and verifies
//! end-to-end behavior of the GraphClient retry policy, delta paging,
//! site/drive resolution and field updates.

mod common;

mod test_client;
mod test_delta;
mod test_provider;
