pub mod command;
pub mod db;
pub mod grouping;
pub mod identity;
pub mod publish;
pub mod reading;
pub mod sensor;
