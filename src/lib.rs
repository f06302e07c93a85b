//! 爬虫下载层的重定向解析与跨边界安全
//!
//! 处理 3xx 与 HTML meta refresh 两类跳转，在跳转时决定请求头、方法、
//! 请求体与代理状态哪些可以延续到下一跳。

pub mod core;
pub mod engine;
pub mod interfaces;
pub mod network;
