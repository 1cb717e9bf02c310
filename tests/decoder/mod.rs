mod engines;
mod properties;
mod scenarios;
