pub mod convert;
pub mod db_counts;
pub mod load;
