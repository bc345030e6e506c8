// src/schemas/engine.rs

//! Motor de validação dos blocos JSONB do cliente.
//!
//! Cada seção é descrita por uma tabela estática de campos (`Field`), que o
//! motor interpreta contra a entrada crua: chaves desconhecidas são
//! rejeitadas, limites numéricos são contratos rígidos (nunca "clampados") e
//! campos ausentes recebem o default declarado. Todos os erros são coletados
//! de uma vez, com o caminho completo do campo, em vez de parar no primeiro.

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::{ValidateEmail, ValidateUrl};

/// Um campo inválido dentro de uma seção: caminho + motivo legível.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "lateFeePercent")]
    pub path: String,
    #[schema(example = "deve ser um número entre 0 e 20")]
    pub message: String,
}

/// O que fazer quando o campo não veio na entrada.
#[derive(Debug, Clone, Copy)]
pub enum Presence {
    /// Ausência é erro.
    Required,
    /// Pode faltar; fica fora da saída.
    Optional,
    /// Ausente recebe o default declarado.
    Default(DefaultValue),
}

#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
    Null,
    EmptyArray,
    EmptyObject,
    StrList(&'static [&'static str]),
    /// Objeto aninhado: valida `{}` contra o schema interno, preenchendo os
    /// defaults de cada campo filho.
    NestedDefaults,
}

/// A regra de tipo/limite de um campo.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Bool,
    Str { min: usize, max: usize },
    Float { min: f64, max: f64 },
    Int { min: i64, max: i64 },
    OneOf(&'static [&'static str]),
    /// Data `YYYY-MM-DD`.
    IsoDate,
    /// Instante RFC 3339 / ISO 8601.
    DateTime,
    /// Competência `YYYY-MM`.
    MonthKey,
    Url,
    Email,
    /// IPv4/IPv6 sintaticamente válido; string vazia é aceita.
    IpOrEmpty,
    /// `#RGB` ou `#RRGGBB`.
    HexColor,
    /// Objeto livre de string -> string.
    StrMap { max_len: usize },
    StrArray { min: usize },
    OneOfArray { allowed: &'static [&'static str], min: usize },
    Object(&'static [Field]),
    ArrayOf(&'static Rule),
    /// `null` é aceito; qualquer outro valor segue a regra interna.
    Nullable(&'static Rule),
    Any,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub key: &'static str,
    pub rule: Rule,
    pub presence: Presence,
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn fail(errors: &mut Vec<FieldError>, path: &str, message: impl Into<String>) {
    errors.push(FieldError {
        path: path.to_string(),
        message: message.into(),
    });
}

/// Valida `raw` contra a tabela de campos, acumulando TODOS os erros em
/// `errors` e devolvendo a saída validada com defaults preenchidos (só tem
/// significado quando `errors` continua vazio).
pub fn validate_object(
    fields: &'static [Field],
    raw: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Value {
    let Some(obj) = raw.as_object() else {
        fail(
            errors,
            if path.is_empty() { "." } else { path },
            "deve ser um objeto",
        );
        return Value::Object(Map::new());
    };

    // Validação estrita: chave fora do schema é rejeitada, não descartada.
    for key in obj.keys() {
        if !fields.iter().any(|f| f.key == key.as_str()) {
            fail(errors, &join(path, key), "campo desconhecido");
        }
    }

    let mut out = Map::new();
    for field in fields {
        let fpath = join(path, field.key);
        match obj.get(field.key) {
            None => match field.presence {
                Presence::Required => fail(errors, &fpath, "campo obrigatório"),
                Presence::Optional => {}
                Presence::Default(dv) => {
                    let value = default_value(dv, field.rule, &fpath, errors);
                    out.insert(field.key.to_string(), value);
                }
            },
            Some(value) => {
                if let Some(checked) = check_value(field.rule, value, &fpath, errors) {
                    out.insert(field.key.to_string(), checked);
                }
            }
        }
    }

    Value::Object(out)
}

fn default_value(
    dv: DefaultValue,
    rule: Rule,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Value {
    match dv {
        DefaultValue::Bool(b) => Value::Bool(b),
        DefaultValue::Int(i) => Value::from(i),
        DefaultValue::Float(f) => Value::from(f),
        DefaultValue::Str(s) => Value::from(s),
        DefaultValue::Null => Value::Null,
        DefaultValue::EmptyArray => Value::Array(Vec::new()),
        DefaultValue::EmptyObject => Value::Object(Map::new()),
        DefaultValue::StrList(items) => {
            Value::Array(items.iter().map(|s| Value::from(*s)).collect())
        }
        DefaultValue::NestedDefaults => match rule {
            Rule::Object(nested) => {
                validate_object(nested, &Value::Object(Map::new()), path, errors)
            }
            _ => Value::Null,
        },
    }
}

fn check_value(
    rule: Rule,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    if value.is_null() {
        return match rule {
            Rule::Nullable(_) => Some(Value::Null),
            _ => {
                fail(errors, path, "não pode ser nulo");
                None
            }
        };
    }

    match rule {
        Rule::Bool => {
            if value.is_boolean() {
                Some(value.clone())
            } else {
                fail(errors, path, "deve ser um booleano");
                None
            }
        }
        Rule::Str { min, max } => {
            let Some(s) = value.as_str() else {
                fail(errors, path, "deve ser uma string");
                return None;
            };
            let len = s.chars().count();
            if len < min {
                fail(errors, path, format!("deve ter no mínimo {min} caractere(s)"));
                return None;
            }
            if len > max {
                fail(errors, path, format!("deve ter no máximo {max} caractere(s)"));
                return None;
            }
            Some(value.clone())
        }
        Rule::Float { min, max } => {
            let Some(n) = value.as_f64() else {
                fail(errors, path, "deve ser um número");
                return None;
            };
            if n < min || n > max {
                if max.is_infinite() {
                    fail(errors, path, format!("deve ser um número maior ou igual a {min}"));
                } else {
                    fail(errors, path, format!("deve ser um número entre {min} e {max}"));
                }
                return None;
            }
            Some(value.clone())
        }
        Rule::Int { min, max } => {
            let Some(n) = value.as_i64() else {
                fail(errors, path, "deve ser um inteiro");
                return None;
            };
            if n < min || n > max {
                if max == i64::MAX {
                    fail(errors, path, format!("deve ser um inteiro maior ou igual a {min}"));
                } else {
                    fail(errors, path, format!("deve ser um inteiro entre {min} e {max}"));
                }
                return None;
            }
            Some(value.clone())
        }
        Rule::OneOf(allowed) => {
            let ok = value.as_str().is_some_and(|s| allowed.contains(&s));
            if ok {
                Some(value.clone())
            } else {
                fail(errors, path, format!("deve ser um de: {}", allowed.join(", ")));
                None
            }
        }
        Rule::IsoDate => {
            let ok = value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok());
            if ok {
                Some(value.clone())
            } else {
                fail(errors, path, "data no formato YYYY-MM-DD");
                None
            }
        }
        Rule::DateTime => {
            let ok = value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok());
            if ok {
                Some(value.clone())
            } else {
                fail(errors, path, "data/hora no formato ISO 8601");
                None
            }
        }
        Rule::MonthKey => {
            let ok = value.as_str().is_some_and(|s| {
                let b = s.as_bytes();
                b.len() == 7
                    && b[..4].iter().all(u8::is_ascii_digit)
                    && b[4] == b'-'
                    && b[5..].iter().all(u8::is_ascii_digit)
            });
            if ok {
                Some(value.clone())
            } else {
                fail(errors, path, "competência no formato YYYY-MM");
                None
            }
        }
        Rule::Url => {
            let ok = value.as_str().is_some_and(|s| s.validate_url());
            if ok {
                Some(value.clone())
            } else {
                fail(errors, path, "deve ser uma URL válida");
                None
            }
        }
        Rule::Email => {
            let ok = value.as_str().is_some_and(|s| s.validate_email());
            if ok {
                Some(value.clone())
            } else {
                fail(errors, path, "deve ser um e-mail válido");
                None
            }
        }
        Rule::IpOrEmpty => {
            let ok = value
                .as_str()
                .is_some_and(|s| s.is_empty() || s.parse::<std::net::IpAddr>().is_ok());
            if ok {
                Some(value.clone())
            } else {
                fail(errors, path, "IP inválido");
                None
            }
        }
        Rule::HexColor => {
            let ok = value.as_str().is_some_and(|s| {
                s.strip_prefix('#').is_some_and(|hex| {
                    (hex.len() == 3 || hex.len() == 6)
                        && hex.bytes().all(|b| b.is_ascii_hexdigit())
                })
            });
            if ok {
                Some(value.clone())
            } else {
                fail(errors, path, "cor no formato #RGB ou #RRGGBB");
                None
            }
        }
        Rule::StrMap { max_len } => {
            let Some(map) = value.as_object() else {
                fail(errors, path, "deve ser um objeto de strings");
                return None;
            };
            let mut ok = true;
            for (k, v) in map {
                match v.as_str() {
                    Some(s) if s.chars().count() <= max_len => {}
                    Some(_) => {
                        fail(
                            errors,
                            &join(path, k),
                            format!("deve ter no máximo {max_len} caractere(s)"),
                        );
                        ok = false;
                    }
                    None => {
                        fail(errors, &join(path, k), "deve ser uma string");
                        ok = false;
                    }
                }
            }
            ok.then(|| value.clone())
        }
        Rule::StrArray { min } => {
            let Some(items) = value.as_array() else {
                fail(errors, path, "deve ser uma lista de strings");
                return None;
            };
            if items.len() < min {
                fail(errors, path, format!("deve ter no mínimo {min} item(ns)"));
                return None;
            }
            let mut ok = true;
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    fail(errors, &format!("{path}[{i}]"), "deve ser uma string");
                    ok = false;
                }
            }
            ok.then(|| value.clone())
        }
        Rule::OneOfArray { allowed, min } => {
            let Some(items) = value.as_array() else {
                fail(errors, path, "deve ser uma lista");
                return None;
            };
            if items.len() < min {
                fail(errors, path, format!("deve ter no mínimo {min} item(ns)"));
                return None;
            }
            let mut ok = true;
            for (i, item) in items.iter().enumerate() {
                if !item.as_str().is_some_and(|s| allowed.contains(&s)) {
                    fail(
                        errors,
                        &format!("{path}[{i}]"),
                        format!("deve ser um de: {}", allowed.join(", ")),
                    );
                    ok = false;
                }
            }
            ok.then(|| value.clone())
        }
        Rule::Object(nested) => {
            let before = errors.len();
            let out = validate_object(nested, value, path, errors);
            (errors.len() == before).then_some(out)
        }
        Rule::ArrayOf(inner) => {
            let Some(items) = value.as_array() else {
                fail(errors, path, "deve ser uma lista");
                return None;
            };
            let before = errors.len();
            let out: Vec<Value> = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| check_value(*inner, item, &format!("{path}[{i}]"), errors))
                .collect();
            (errors.len() == before).then(|| Value::Array(out))
        }
        Rule::Nullable(inner) => check_value(*inner, value, path, errors),
        Rule::Any => Some(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static NESTED: &[Field] = &[
        Field {
            key: "enabled",
            rule: Rule::Bool,
            presence: Presence::Default(DefaultValue::Bool(false)),
        },
        Field {
            key: "url",
            rule: Rule::Url,
            presence: Presence::Optional,
        },
    ];

    static FIELDS: &[Field] = &[
        Field {
            key: "name",
            rule: Rule::Str { min: 1, max: 10 },
            presence: Presence::Required,
        },
        Field {
            key: "percent",
            rule: Rule::Float { min: 0.0, max: 20.0 },
            presence: Presence::Default(DefaultValue::Float(2.0)),
        },
        Field {
            key: "day",
            rule: Rule::Int { min: 1, max: 28 },
            presence: Presence::Default(DefaultValue::Int(1)),
        },
        Field {
            key: "webhook",
            rule: Rule::Object(NESTED),
            presence: Presence::Default(DefaultValue::NestedDefaults),
        },
        Field {
            key: "note",
            rule: Rule::Nullable(&Rule::Str { min: 1, max: 50 }),
            presence: Presence::Optional,
        },
    ];

    #[test]
    fn fills_defaults_including_nested_objects() {
        let mut errors = Vec::new();
        let out = validate_object(FIELDS, &json!({ "name": "ok" }), "", &mut errors);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(
            out,
            json!({
                "name": "ok",
                "percent": 2.0,
                "day": 1,
                "webhook": { "enabled": false }
            })
        );
    }

    #[test]
    fn collects_every_error_not_just_the_first() {
        let mut errors = Vec::new();
        validate_object(
            FIELDS,
            &json!({ "percent": 99, "day": 0, "extra": true }),
            "",
            &mut errors,
        );
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"name"));
        assert!(paths.contains(&"percent"));
        assert!(paths.contains(&"day"));
        assert!(paths.contains(&"extra"));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn nested_errors_carry_full_path() {
        let mut errors = Vec::new();
        validate_object(
            FIELDS,
            &json!({ "name": "ok", "webhook": { "enabled": true, "url": "nada" } }),
            "",
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "webhook.url");
    }

    #[test]
    fn nullable_accepts_null_but_checks_values() {
        let mut errors = Vec::new();
        let out = validate_object(FIELDS, &json!({ "name": "ok", "note": null }), "", &mut errors);
        assert!(errors.is_empty());
        assert_eq!(out.get("note"), Some(&Value::Null));

        let mut errors = Vec::new();
        validate_object(FIELDS, &json!({ "name": "ok", "note": "" }), "", &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "note");
    }

    #[test]
    fn out_of_range_is_rejected_never_clamped() {
        let mut errors = Vec::new();
        let out = validate_object(
            FIELDS,
            &json!({ "name": "ok", "percent": 20.5 }),
            "",
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert!(out.get("percent").is_none());
    }

    #[test]
    fn non_object_input_is_a_single_clear_error() {
        let mut errors = Vec::new();
        validate_object(FIELDS, &json!([1, 2]), "", &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "deve ser um objeto");
    }
}
