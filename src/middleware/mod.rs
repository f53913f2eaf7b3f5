/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: Bearer 検証 + ロール認可 (Pipeline / Stage)
 * - http: request id / trace / body limit / timeout
 */
pub mod auth;
pub mod http;
