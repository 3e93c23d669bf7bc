//! Single-asset deal pro-forma.
//!
//! A [`DealModel`] is built from [`DealAssumptions`] by a chain of pure
//! stages: financing, first operating year, hold projection and sale, then
//! the investor/sponsor waterfall.

pub mod assumptions;
pub mod financing;
pub mod model;
pub mod operations;
pub mod sale;
pub mod scenario;
pub mod waterfall;

pub use assumptions::{
    CapitalClass, ClassTerms, DealAssumptions, PropertyAssumptions, RentRoll, SeasonalRentRoll,
    WaterfallTerms,
};
pub use model::{analyze_deal, analyze_property, DealModel, PropertyAnalysis};
