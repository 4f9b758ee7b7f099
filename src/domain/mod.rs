// Domain layer - Plain data shared by every other layer
pub mod catalog;
pub mod series;
