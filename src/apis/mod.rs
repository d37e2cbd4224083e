pub mod neo_feed;
