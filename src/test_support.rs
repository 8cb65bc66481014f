use tokio::sync::Mutex as AsyncMutex;

/// Serializes tests that set or remove `MEDCHAT_*` environment variables.
/// Sync tests take it with `.blocking_lock()`, async tests with `.lock().await`.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());
