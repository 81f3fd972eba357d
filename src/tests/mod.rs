mod support;

mod match_fetcher_tests;
mod rate_limiter_tests;
