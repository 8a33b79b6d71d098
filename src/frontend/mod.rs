//! Frontend module - Lexer, Declaration Parser, Ham Parser, Structure Scraper

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod header;
pub mod ham;
pub mod structures;
