use redis::{AsyncCommands, RedisResult};
use uuid::Uuid;

/// Redis key layout for execution history.
/// Each execution is stored as JSON under its own key; a list holds ids in
/// record order so history can be read back newest-first.

pub const EXECUTION_PREFIX: &str = "agentcheck:execution";
pub const EXECUTION_INDEX: &str = "agentcheck:executions";

/// Generate the storage key for an execution
pub fn execution_key(execution_id: &Uuid) -> String {
    format!("{}:{}", EXECUTION_PREFIX, execution_id)
}

/// SET NX the payload and append the id to the index in one step, so an
/// execution is either fully recorded or not at all. Returns 1 when written.
const RECORD_SCRIPT: &str = r"
if redis.call('SET', KEYS[1], ARGV[1], 'NX') then
  redis.call('RPUSH', KEYS[2], ARGV[2])
  return 1
end
return 0
";

/// Store a serialized execution under its id and append the id to the
/// history index. An existing execution is never overwritten.
///
/// Returns `Ok(false)` when the id is already taken.
pub async fn record_execution(
    conn: &mut redis::aio::ConnectionManager,
    execution_id: &Uuid,
    payload: &str,
) -> RedisResult<bool> {
    let created: i64 = redis::Script::new(RECORD_SCRIPT)
        .key(execution_key(execution_id))
        .key(EXECUTION_INDEX)
        .arg(payload)
        .arg(execution_id.to_string())
        .invoke_async(conn)
        .await?;
    Ok(created == 1)
}

/// Serialized execution stored under an id
pub async fn get_execution_payload(
    conn: &mut redis::aio::ConnectionManager,
    execution_id: &Uuid,
) -> RedisResult<Option<String>> {
    conn.get(execution_key(execution_id)).await
}

/// Raw index entries, in record order
pub async fn list_execution_ids(
    conn: &mut redis::aio::ConnectionManager,
) -> RedisResult<Vec<String>> {
    conn.lrange(EXECUTION_INDEX, 0, -1).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_key_deterministic() {
        let id = Uuid::new_v4();
        let key1 = execution_key(&id);
        let key2 = execution_key(&id);
        assert_eq!(key1, key2);
        assert!(key1.starts_with("agentcheck:execution:"));
        assert!(key1.ends_with(&id.to_string()));
    }

    #[test]
    fn test_record_script_is_conditional() {
        let set_at = RECORD_SCRIPT.find("'SET', KEYS[1], ARGV[1], 'NX'").unwrap();
        let push_at = RECORD_SCRIPT.find("'RPUSH', KEYS[2], ARGV[2]").unwrap();
        assert!(set_at < push_at);
        assert!(RECORD_SCRIPT.contains("return 0"));
    }

    #[test]
    fn test_index_is_distinct_from_execution_keys() {
        let id = Uuid::new_v4();
        assert_ne!(execution_key(&id), EXECUTION_INDEX);
        assert!(!EXECUTION_INDEX.starts_with(&format!("{}:", EXECUTION_PREFIX)));
    }
}
