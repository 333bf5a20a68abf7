mod pipeline;
mod concurrency;
