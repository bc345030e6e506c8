// src/schemas/merge.rs

//! Deep merge dos blocos de configuração: objetos mesclam, arrays (e
//! qualquer escalar) substituem por inteiro. Roda sempre DEPOIS da validação
//! da seção, com a saída validada/defaultada como `patch`, então o merge
//! nunca introduz valor não validado no bloco armazenado.

use serde_json::Value;

pub fn deep_merge(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            let mut out = base_map.clone();
            for (key, incoming) in patch_map {
                let merged = match out.get(key) {
                    Some(current @ Value::Object(_)) if incoming.is_object() => {
                        deep_merge(current, incoming)
                    }
                    _ => incoming.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        // Base não-objeto (ou array): o patch vence por inteiro.
        _ => patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_merge_preserves_untouched_sibling() {
        let merged = deep_merge(&json!({"a": {"b": 1, "c": 2}}), &json!({"a": {"b": 5}}));
        assert_eq!(merged, json!({"a": {"b": 5, "c": 2}}));
    }

    #[test]
    fn arrays_replace_never_append() {
        let merged = deep_merge(&json!({"a": [1, 2, 3]}), &json!({"a": [9]}));
        assert_eq!(merged, json!({"a": [9]}));
    }

    #[test]
    fn scalar_and_type_mismatch_replace_wholesale() {
        let merged = deep_merge(&json!({"a": {"b": 1}, "c": 7}), &json!({"a": "x", "d": null}));
        assert_eq!(merged, json!({"a": "x", "c": 7, "d": null}));
    }

    #[test]
    fn keys_only_in_base_survive() {
        let merged = deep_merge(&json!({"keep": true}), &json!({"new": 1}));
        assert_eq!(merged, json!({"keep": true, "new": 1}));
    }

    #[test]
    fn merge_is_idempotent() {
        let base = json!({"a": {"b": 1, "c": [1, 2]}, "d": "x"});
        let patch = json!({"a": {"b": 9, "c": [3]}});
        let once = deep_merge(&base, &patch);
        let twice = deep_merge(&base, &deep_merge(&base, &patch));
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_base_takes_the_patch() {
        let patch = json!({"a": {"b": 1}});
        assert_eq!(deep_merge(&json!({}), &patch), patch);
    }
}
