//! Single-year fiscal arithmetic

mod resolver;

pub use resolver::{AnnualResolver, ArithmeticFallback, Resolution, YearInputs};
