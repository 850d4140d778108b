//! アプリケーションマニフェストの解析
//!
//! 整形式チェック付きの最小限のタグスキャナ。
//! ルート要素の直下にある `{asm.v1}assemblyIdentity` の `name` 属性だけを取り出す。
//! DTD の内部サブセットや外部実体は扱わない。

pub const ASM_V1_NAMESPACE: &str = "urn:schemas-microsoft-com:asm.v1";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];

/// リソースのバイト列を文字列へ。UTF-8 BOM を除き、UTF-16LE も受け付ける
pub fn decode_manifest(bytes: &[u8]) -> Result<String, String> {
    let text = if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        decode_utf8(rest)?
    } else if let Some(rest) = bytes.strip_prefix(UTF16LE_BOM) {
        decode_utf16le(rest)?
    } else if bytes.len() >= 2 && bytes[0] != 0 && bytes[1] == 0 {
        decode_utf16le(bytes)?
    } else {
        decode_utf8(bytes)?
    };
    Ok(text.trim_end_matches('\0').to_string())
}

fn decode_utf8(bytes: &[u8]) -> Result<String, String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| format!("invalid UTF-8: {}", e))
}

fn decode_utf16le(bytes: &[u8]) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err("odd byte count for UTF-16".into());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| format!("invalid UTF-16: {}", e))
}

/// ルート直下の assemblyIdentity@name を返す。
/// 要素または属性がなければ `Ok(None)`、整形式でなければ `Err`
pub fn assembly_identity_name(xml: &str) -> Result<Option<String>, String> {
    let mut cur = Cursor { src: xml, pos: 0 };
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut root_seen = false;
    let mut root_closed = false;
    let mut found: Option<Option<String>> = None;

    while !cur.eof() {
        if !cur.starts_with("<") {
            let text = cur.take_until('<');
            if stack.is_empty() && !text.trim().is_empty() {
                return Err("text outside the root element".into());
            }
            if !stack.is_empty() {
                decode_entities(text)?;
            }
            continue;
        }
        if cur.starts_with("<?") {
            cur.skip_past("?>", "processing instruction")?;
        } else if cur.starts_with("<!--") {
            cur.skip_past("-->", "comment")?;
        } else if cur.starts_with("<![CDATA[") {
            if stack.is_empty() {
                return Err("CDATA outside the root element".into());
            }
            cur.skip_past("]]>", "CDATA section")?;
        } else if cur.starts_with("<!") {
            if root_seen {
                return Err("declaration after the root element".into());
            }
            cur.skip_past(">", "declaration")?;
        } else if cur.starts_with("</") {
            cur.bump(2);
            let name = cur.take_name()?;
            cur.skip_ws();
            cur.expect('>')?;
            match stack.pop() {
                Some(frame) if frame.name == name => {}
                Some(frame) => {
                    return Err(format!(
                        "mismatched end tag </{}> for <{}>",
                        name, frame.name
                    ));
                }
                None => return Err(format!("unexpected end tag </{}>", name)),
            }
            if stack.is_empty() {
                root_closed = true;
            }
        } else {
            if root_closed {
                return Err("multiple root elements".into());
            }
            cur.bump(1);
            let tag = parse_start_tag(&mut cur)?;
            let frame = Frame::from_tag(&tag)?;
            let depth = stack.len();
            root_seen = true;
            if depth == 1 && found.is_none() {
                let (ns, local) = resolve_element(&tag.name, &frame, &stack)?;
                if local == "assemblyIdentity" && ns.as_deref() == Some(ASM_V1_NAMESPACE) {
                    let name = tag
                        .attrs
                        .iter()
                        .find(|(k, _)| *k == "name")
                        .map(|(_, v)| v.clone());
                    found = Some(name);
                }
            } else {
                // 未束縛の接頭辞を検出するため解決だけは行う
                resolve_element(&tag.name, &frame, &stack)?;
            }
            if !tag.self_closing {
                stack.push(frame);
            } else if depth == 0 {
                root_closed = true;
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    if !root_seen {
        return Err("no root element".into());
    }
    Ok(found.flatten())
}

struct StartTag<'a> {
    name: &'a str,
    attrs: Vec<(&'a str, String)>,
    self_closing: bool,
}

/// 要素ごとの名前空間宣言
struct Frame<'a> {
    name: &'a str,
    default_ns: Option<String>,
    prefixes: Vec<(&'a str, String)>,
}

impl<'a> Frame<'a> {
    fn from_tag(tag: &StartTag<'a>) -> Result<Self, String> {
        let mut default_ns = None;
        let mut prefixes = Vec::new();
        for (key, value) in &tag.attrs {
            let key: &'a str = *key;
            if key == "xmlns" {
                default_ns = Some(value.clone());
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                if value.is_empty() {
                    return Err(format!("empty namespace for prefix {}", prefix));
                }
                prefixes.push((prefix, value.clone()));
            }
        }
        Ok(Self {
            name: tag.name,
            default_ns,
            prefixes,
        })
    }
}

fn resolve_element<'a, 'f>(
    qname: &'a str,
    own: &Frame<'f>,
    stack: &[Frame<'f>],
) -> Result<(Option<String>, &'a str), String> {
    let scopes = std::iter::once(own).chain(stack.iter().rev());
    match qname.split_once(':') {
        Some((prefix, local)) => {
            if prefix == "xml" {
                return Ok((Some("http://www.w3.org/XML/1998/namespace".into()), local));
            }
            for frame in scopes {
                if let Some((_, ns)) = frame.prefixes.iter().find(|(p, _)| *p == prefix) {
                    return Ok((Some(ns.clone()), local));
                }
            }
            Err(format!("unbound namespace prefix {}", prefix))
        }
        None => {
            for frame in scopes {
                if let Some(ns) = &frame.default_ns {
                    let ns = (!ns.is_empty()).then(|| ns.clone());
                    return Ok((ns, qname));
                }
            }
            Ok((None, qname))
        }
    }
}

fn parse_start_tag<'a>(cur: &mut Cursor<'a>) -> Result<StartTag<'a>, String> {
    let name = cur.take_name()?;
    let mut attrs: Vec<(&'a str, String)> = Vec::new();
    loop {
        let had_space = cur.skip_ws();
        if cur.starts_with("/>") {
            cur.bump(2);
            return Ok(StartTag {
                name,
                attrs,
                self_closing: true,
            });
        }
        if cur.starts_with(">") {
            cur.bump(1);
            return Ok(StartTag {
                name,
                attrs,
                self_closing: false,
            });
        }
        if cur.eof() {
            return Err(format!("unterminated start tag <{}>", name));
        }
        if !had_space {
            return Err(format!("missing whitespace before attribute in <{}>", name));
        }
        let key = cur.take_name()?;
        cur.skip_ws();
        cur.expect('=')?;
        cur.skip_ws();
        let quote = match cur.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(format!("attribute {} is not quoted", key)),
        };
        cur.bump(1);
        let raw = cur.take_until(quote);
        cur.expect(quote)?;
        if raw.contains('<') {
            return Err(format!("'<' in value of attribute {}", key));
        }
        if attrs.iter().any(|(k, _)| *k == key) {
            return Err(format!("duplicate attribute {}", key));
        }
        attrs.push((key, decode_entities(raw)?));
    }
}

/// 定義済み実体と文字参照を展開
fn decode_entities(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| "unterminated entity reference".to_string())?;
        let entity = &after[..semi];
        let ch = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown entity &{};", entity))?
            }
        };
        out.push(ch);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// ASCII 区切り文字の分だけ進める
    fn bump(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.src.len());
    }

    /// 空白を飛ばす。飛ばしたら true
    fn skip_ws(&mut self) -> bool {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
        rest.len() != trimmed.len()
    }

    fn expect(&mut self, ch: char) -> Result<(), String> {
        if self.peek() == Some(ch) {
            self.bump(ch.len_utf8());
            Ok(())
        } else {
            Err(format!("expected '{}' at offset {}", ch, self.pos))
        }
    }

    fn take_until(&mut self, ch: char) -> &'a str {
        let rest = self.rest();
        let end = rest.find(ch).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn take_name(&mut self) -> Result<&'a str, String> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '=' | '<' | '"' | '\''))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(format!("expected a name at offset {}", self.pos));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    fn skip_past(&mut self, marker: &str, what: &str) -> Result<(), String> {
        match self.rest().find(marker) {
            Some(idx) => {
                self.pos += idx + marker.len();
                Ok(())
            }
            None => Err(format!("unterminated {}", what)),
        }
    }
}
