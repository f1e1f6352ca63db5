//! Integration tests for Sumi-Crawl

mod crawl_tests;
mod downloader_tests;
