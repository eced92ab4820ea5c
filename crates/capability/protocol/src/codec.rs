//! 文本行协议编解码
//!
//! 请求行严格匹配 `ACTION:PARAM:VALUE`：
//! - `ACTION` 为 `W`、`R` 或 `P`
//! - `PARAM` 为一个或多个 `[A-Za-z0-9_]` 字符
//! - `VALUE` 为零个或多个 `[A-Za-z0-9_]` 字符
//!
//! 语法不匹配返回 `E:BADPROTOCOLMATCH:`；动作与取值组合不合法返回 `E:BADCOMMAND:`。

use std::fmt;

/// 单条报文的最大字节数。
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// 解析后的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `W:<param>:<value>`
    Write { param: String, value: String },
    /// `R:<param>:`
    Read { param: String },
    /// `P:S:`：参数清单输出到设备日志
    PoolStatus,
    /// `P:C:`：参数清单返回给对端
    PoolCatalog,
}

/// 协议错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadProtocolMatch,
    BadCommand,
    ParamNotFound,
    BadArgType,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadProtocolMatch => "BADPROTOCOLMATCH",
            Self::BadCommand => "BADCOMMAND",
            Self::ParamNotFound => "PARAMNOTFOUND",
            Self::BadArgType => "BADARGTYPE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `R:<param>:<value>`
    Read { param: String, value: String },
    /// `S:<param>:<value>`
    Set { param: String, value: String },
    /// `P:S:OK`
    StatusOk,
    /// 每个参数一行描述
    Catalog(Vec<String>),
    /// `E:<CODE>:`
    Error(ErrorCode),
}

impl Response {
    /// 编码为应答文本（不含结尾换行）。
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { param, value } => write!(f, "R:{}:{}", param, value),
            Self::Set { param, value } => write!(f, "S:{}:{}", param, value),
            Self::StatusOk => f.write_str("P:S:OK"),
            Self::Catalog(lines) => f.write_str(&lines.join("\n")),
            Self::Error(code) => write!(f, "E:{}:", code),
        }
    }
}

/// 解析一行请求（不含行结束符）。
pub fn parse_request(line: &str) -> Result<Request, ErrorCode> {
    let mut fields = line.split(':');
    let (action, param, value) = match (fields.next(), fields.next(), fields.next(), fields.next())
    {
        (Some(action), Some(param), Some(value), None) => (action, param, value),
        _ => return Err(ErrorCode::BadProtocolMatch),
    };

    if !matches!(action, "W" | "R" | "P") || param.is_empty() || !is_token(param) || !is_token(value)
    {
        return Err(ErrorCode::BadProtocolMatch);
    }

    match (action, param, value.is_empty()) {
        ("W", _, true) => Err(ErrorCode::BadCommand),
        ("R" | "P", _, false) => Err(ErrorCode::BadCommand),
        ("W", _, false) => Ok(Request::Write {
            param: param.to_string(),
            value: value.to_string(),
        }),
        ("R", _, true) => Ok(Request::Read {
            param: param.to_string(),
        }),
        ("P", "S", true) => Ok(Request::PoolStatus),
        ("P", "C", true) => Ok(Request::PoolCatalog),
        _ => Err(ErrorCode::BadCommand),
    }
}

fn is_token(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_requests() {
        assert_eq!(
            parse_request("R:D:"),
            Ok(Request::Read {
                param: "D".to_string()
            })
        );
        assert_eq!(
            parse_request("W:my_param:new_val1"),
            Ok(Request::Write {
                param: "my_param".to_string(),
                value: "new_val1".to_string()
            })
        );
        assert_eq!(parse_request("P:S:"), Ok(Request::PoolStatus));
        assert_eq!(parse_request("P:C:"), Ok(Request::PoolCatalog));
    }

    #[test]
    fn rejects_grammar_mismatch() {
        for line in [
            "",
            "R:D",
            "X:D:",
            "r:D:",
            "R::",
            "R:D:x:y",
            "W:D:1.5",
            "W:D:-3",
            "R:D :",
            " R:D:",
            "W:D:new val",
            "R:é:",
        ] {
            assert_eq!(parse_request(line), Err(ErrorCode::BadProtocolMatch), "{line:?}");
        }
    }

    #[test]
    fn rejects_bad_combinations() {
        assert_eq!(parse_request("W:D:"), Err(ErrorCode::BadCommand));
        assert_eq!(parse_request("R:D:x"), Err(ErrorCode::BadCommand));
        assert_eq!(parse_request("P:S:x"), Err(ErrorCode::BadCommand));
        assert_eq!(parse_request("P:X:"), Err(ErrorCode::BadCommand));
    }

    #[test]
    fn encodes_responses() {
        assert_eq!(
            Response::Read {
                param: "D".to_string(),
                value: "mystring".to_string()
            }
            .encode(),
            "R:D:mystring"
        );
        assert_eq!(
            Response::Set {
                param: "D".to_string(),
                value: "newval".to_string()
            }
            .encode(),
            "S:D:newval"
        );
        assert_eq!(Response::StatusOk.encode(), "P:S:OK");
        assert_eq!(
            Response::Error(ErrorCode::BadProtocolMatch).encode(),
            "E:BADPROTOCOLMATCH:"
        );
        assert_eq!(Response::Error(ErrorCode::BadCommand).encode(), "E:BADCOMMAND:");
        assert_eq!(
            Response::Error(ErrorCode::ParamNotFound).encode(),
            "E:PARAMNOTFOUND:"
        );
        assert_eq!(Response::Error(ErrorCode::BadArgType).encode(), "E:BADARGTYPE:");
        assert_eq!(
            Response::Catalog(vec!["a".to_string(), "b".to_string()]).encode(),
            "a\nb"
        );
    }
}
