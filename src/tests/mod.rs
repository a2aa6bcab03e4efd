mod pair;
mod pool;
mod scenarios;
