pub mod bracket;
pub mod config;
pub mod escape;
pub mod expand;
pub mod generator;
pub mod grammar;
pub mod inflect;
pub mod lexer;
pub mod lint;
pub mod parser;
pub mod select;
