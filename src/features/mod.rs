pub mod assembler;
pub mod row;
pub mod schema;
