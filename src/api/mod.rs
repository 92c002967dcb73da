pub mod coingecko;
pub mod dexscreener;
pub mod raydium;
pub mod rugcheck;
