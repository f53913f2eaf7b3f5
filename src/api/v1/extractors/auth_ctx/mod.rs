/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - 認証済みリクエストのコンテキスト（AuthContext）を handler に提供する
 * - 型定義は middleware::auth::context 側に置き、ここは axum の extractor だけ
 */

mod core;

pub use core::AuthCtxExtractor;
