//! Labelled-object text form.
//!
//! ```text
//! Object = ControlNetwork
//!   NetworkId      = Sample
//!   CoordinateType = Rectangular
//!   Version        = 1
//!
//!   Object = ControlPoint
//!     PointType = Free
//!     PointId   = p0
//!     AprioriX  = 1000.0 <meters>
//!
//!     Group = ControlMeasure
//!       SerialNumber = ALPHA
//!       MeasureType  = Candidate
//!       Sample       = 10.5
//!       Reference    = True
//!     End_Group
//!   End_Object
//! End_Object
//! End
//! ```
//!
//! Keyword names and block markers are case-insensitive on input. Values
//! are bare words, double-quoted strings (backslash escapes the next
//! character) or parenthesised lists, optionally followed by a `<unit>`.
//! `#` starts a comment.

use std::fmt::Write as _;

use super::{LogRecord, MeasureEntry, NetworkFile, PointEntry, SurfaceEntry};
use crate::model::{CoordinateType, LogDataType};
use crate::{Error, Result};

pub const FORMAT_VERSION: &str = "1";

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PvlKeyword {
    pub name: String,
    pub values: Vec<String>,
    pub unit: Option<String>,
}

impl PvlKeyword {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self { name: name.to_string(), values: vec![value.into()], unit: None }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PvlGroup {
    pub name: String,
    pub keywords: Vec<PvlKeyword>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PvlObject {
    pub name: String,
    pub keywords: Vec<PvlKeyword>,
    pub groups: Vec<PvlGroup>,
    pub objects: Vec<PvlObject>,
}

fn find<'k>(keywords: &'k [PvlKeyword], name: &str) -> Option<&'k PvlKeyword> {
    keywords.iter().find(|k| k.name.eq_ignore_ascii_case(name))
}

impl PvlObject {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    pub fn keyword(&self, name: &str) -> Option<&PvlKeyword> {
        find(&self.keywords, name)
    }

    pub fn object(&self, name: &str) -> Option<&PvlObject> {
        self.objects.iter().find(|o| o.name.eq_ignore_ascii_case(name))
    }
}

impl PvlGroup {
    pub fn keyword(&self, name: &str) -> Option<&PvlKeyword> {
        find(&self.keywords, name)
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Equals,
    LParen,
    RParen,
    Comma,
    Unit(String),
}

const SPECIAL: &[char] = &['=', '(', ')', ',', '"', '<', '>', '#'];

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while chars.next_if(|&ch| ch != '\n').is_some() {}
            }
            '=' | '(' | ')' | ',' => {
                chars.next();
                let token = match c {
                    '=' => Token::Equals,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                };
                tokens.push((token, line));
            }
            '"' => {
                chars.next();
                let start = line;
                let mut s = String::new();
                loop {
                    let ch = match chars.next() {
                        Some('"') => break,
                        Some('\\') => chars.next(),
                        other => other,
                    };
                    let Some(ch) = ch else {
                        return Err(Error::user(format!(
                            "Unterminated quoted string starting on line {start}"
                        )));
                    };
                    if ch == '\n' {
                        line += 1;
                    }
                    s.push(ch);
                }
                tokens.push((Token::Quoted(s), start));
            }
            '<' => {
                chars.next();
                let mut unit = String::new();
                loop {
                    match chars.next() {
                        Some('>') => break,
                        Some('\n') | None => {
                            return Err(Error::user(format!("Unterminated unit on line {line}")));
                        }
                        Some(ch) => unit.push(ch),
                    }
                }
                tokens.push((Token::Unit(unit.trim().to_string()), line));
            }
            _ => {
                let mut word = String::new();
                while let Some(ch) = chars.next_if(|&ch| !ch.is_whitespace() && !SPECIAL.contains(&ch)) {
                    word.push(ch);
                }
                if word.is_empty() {
                    return Err(Error::user(format!("Unexpected character [{c}] on line {line}")));
                }
                tokens.push((Token::Word(word), line));
            }
        }
    }
    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Clone, Copy, PartialEq)]
enum Block {
    Root,
    Object,
    Group,
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn expect_equals(&mut self, after: &str) -> Result<()> {
        match self.next() {
            Some((Token::Equals, _)) => Ok(()),
            Some((_, line)) => Err(Error::user(format!("Expected [=] after [{after}] on line {line}"))),
            None => Err(Error::user(format!("Expected [=] after [{after}] at end of input"))),
        }
    }

    fn scalar(&mut self, keyword: &str) -> Result<String> {
        match self.next() {
            Some((Token::Word(w) | Token::Quoted(w), _)) => Ok(w),
            Some((_, line)) => Err(Error::user(format!(
                "Invalid value for keyword [{keyword}] on line {line}"
            ))),
            None => Err(Error::user(format!("Missing value for keyword [{keyword}]"))),
        }
    }

    fn keyword(&mut self, name: String) -> Result<PvlKeyword> {
        self.expect_equals(&name)?;
        let mut values = Vec::new();
        if self.peek() == Some(&Token::LParen) {
            self.next();
            if self.peek() == Some(&Token::RParen) {
                self.next();
            } else {
                loop {
                    values.push(self.scalar(&name)?);
                    match self.next() {
                        Some((Token::Comma, _)) => continue,
                        Some((Token::RParen, _)) => break,
                        _ => {
                            return Err(Error::user(format!(
                                "Unterminated list for keyword [{name}]"
                            )));
                        }
                    }
                }
            }
        } else {
            values.push(self.scalar(&name)?);
        }
        let unit = match self.peek() {
            Some(Token::Unit(_)) => match self.next() {
                Some((Token::Unit(u), _)) => Some(u),
                _ => None,
            },
            _ => None,
        };
        Ok(PvlKeyword { name, values, unit })
    }

    /// Parse statements into `into` until the marker closing `block`.
    fn block(&mut self, block: Block, into: &mut PvlObject) -> Result<()> {
        loop {
            let Some((token, line)) = self.next() else {
                return match block {
                    Block::Root => Ok(()),
                    Block::Object => Err(Error::user(format!(
                        "Missing End_Object for object [{}]",
                        into.name
                    ))),
                    Block::Group => Err(Error::user(format!(
                        "Missing End_Group for group [{}]",
                        into.name
                    ))),
                };
            };
            let Token::Word(word) = token else {
                return Err(Error::user(format!("Unexpected token on line {line}")));
            };

            let is = |marker: &str| word.eq_ignore_ascii_case(marker);
            if is("End") && block == Block::Root {
                return Ok(());
            }
            if (is("End_Object") || is("EndObject")) && block == Block::Object {
                return Ok(());
            }
            if (is("End_Group") || is("EndGroup")) && block == Block::Group {
                return Ok(());
            }
            if is("Object") || is("Group") {
                let nested = if is("Object") { Block::Object } else { Block::Group };
                if block == Block::Group {
                    return Err(Error::user(format!(
                        "Groups cannot contain [{word}] (line {line})"
                    )));
                }
                self.expect_equals(&word)?;
                let name = self.scalar(&word)?;
                let mut child = PvlObject::new(&name);
                self.block(nested, &mut child)?;
                match nested {
                    Block::Object => into.objects.push(child),
                    _ => into.groups.push(PvlGroup { name: child.name, keywords: child.keywords }),
                }
                continue;
            }
            if is("End") || is("End_Object") || is("End_Group") {
                return Err(Error::user(format!("Unexpected [{word}] on line {line}")));
            }
            let keyword = self.keyword(word)?;
            into.keywords.push(keyword);
        }
    }
}

/// Parse a document into a root object holding its top-level statements.
pub fn parse(text: &str) -> Result<PvlObject> {
    let mut parser = Parser { tokens: tokenize(text)?, pos: 0 };
    let mut root = PvlObject::new("Root");
    parser.block(Block::Root, &mut root)?;
    Ok(root)
}

// ============================================================================
// Renderer
// ============================================================================

fn needs_quotes(value: &str) -> bool {
    value.is_empty() || value.chars().any(|c| c.is_whitespace() || SPECIAL.contains(&c) || c == '\\')
}

fn render_scalar(out: &mut String, value: &str) {
    if !needs_quotes(value) {
        out.push_str(value);
        return;
    }
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

fn render_keywords(out: &mut String, keywords: &[PvlKeyword], indent: usize) {
    let width = keywords.iter().map(|k| k.name.len()).max().unwrap_or(0);
    for k in keywords {
        let _ = write!(out, "{:indent$}{:width$} = ", "", k.name);
        match k.values.as_slice() {
            [single] => render_scalar(out, single),
            many => {
                out.push('(');
                for (i, v) in many.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    render_scalar(out, v);
                }
                out.push(')');
            }
        }
        if let Some(unit) = &k.unit {
            let _ = write!(out, " <{unit}>");
        }
        out.push('\n');
    }
}

fn render_object(out: &mut String, object: &PvlObject, indent: usize) {
    let _ = writeln!(out, "{:indent$}Object = {}", "", object.name);
    render_keywords(out, &object.keywords, indent + 2);
    for group in &object.groups {
        out.push('\n');
        let _ = writeln!(out, "{:width$}Group = {}", "", group.name, width = indent + 2);
        render_keywords(out, &group.keywords, indent + 4);
        let _ = writeln!(out, "{:width$}End_Group", "", width = indent + 2);
    }
    for child in &object.objects {
        out.push('\n');
        render_object(out, child, indent + 2);
    }
    let _ = writeln!(out, "{:indent$}End_Object", "");
}

/// Render a root object: its keywords and children at top level, then `End`.
pub fn render(root: &PvlObject) -> String {
    let mut out = String::new();
    render_keywords(&mut out, &root.keywords, 0);
    for child in &root.objects {
        render_object(&mut out, child, 0);
    }
    out.push_str("End\n");
    out
}

// ============================================================================
// NetworkFile <-> tree
// ============================================================================

fn number(v: f64) -> String {
    format!("{v:?}")
}

fn flag(keywords: &mut Vec<PvlKeyword>, name: &str, set: bool) {
    if set {
        keywords.push(PvlKeyword::new(name, "True"));
    }
}

fn text(keywords: &mut Vec<PvlKeyword>, name: &str, value: &str) {
    if !value.is_empty() {
        keywords.push(PvlKeyword::new(name, value));
    }
}

fn optional(keywords: &mut Vec<PvlKeyword>, name: &str, value: Option<f64>, unit: Option<&str>) {
    if let Some(v) = value {
        let keyword = PvlKeyword::new(name, number(v));
        keywords.push(match unit {
            Some(u) => keyword.with_unit(u),
            None => keyword,
        });
    }
}

/// Keyword suffixes and units for each coordinate frame.
fn frame_keys(frame: CoordinateType) -> [(&'static str, &'static str); 3] {
    match frame {
        CoordinateType::Rectangular => [("X", "meters"), ("Y", "meters"), ("Z", "meters")],
        CoordinateType::Latitudinal => {
            [("Latitude", "degrees"), ("Longitude", "degrees"), ("Radius", "meters")]
        }
    }
}

fn surface_keywords(
    keywords: &mut Vec<PvlKeyword>,
    prefix: &str,
    surface: Option<&SurfaceEntry>,
    frame: CoordinateType,
) {
    let Some(surface) = surface else { return };
    for ((suffix, unit), value) in frame_keys(frame).into_iter().zip(surface.coordinates) {
        keywords.push(PvlKeyword::new(&format!("{prefix}{suffix}"), number(value)).with_unit(unit));
    }
    if let Some(covariance) = surface.covariance {
        keywords.push(PvlKeyword {
            name: format!("{prefix}CovarianceMatrix"),
            values: covariance.iter().map(|v| number(*v)).collect(),
            unit: None,
        });
    }
}

fn network_frame(file: &NetworkFile) -> CoordinateType {
    CoordinateType::from_name(&file.coordinate_type).unwrap_or_default()
}

/// Build the document tree for `file`.
pub fn to_pvl(file: &NetworkFile) -> PvlObject {
    let frame = network_frame(file);
    let mut net = PvlObject::new("ControlNetwork");
    let kw = &mut net.keywords;
    text(kw, "NetworkId", &file.network_id);
    text(kw, "TargetName", &file.target_name);
    text(kw, "UserName", &file.user_name);
    text(kw, "Created", &file.created);
    text(kw, "LastModified", &file.modified);
    text(kw, "Description", &file.description);
    kw.push(PvlKeyword::new("CoordinateType", frame.as_str()));
    kw.push(PvlKeyword::new("Version", FORMAT_VERSION));

    net.objects = file.points.iter().map(|p| point_object(p, frame)).collect();

    let mut root = PvlObject::new("Root");
    root.objects.push(net);
    root
}

fn point_object(p: &PointEntry, frame: CoordinateType) -> PvlObject {
    let mut object = PvlObject::new("ControlPoint");
    let kw = &mut object.keywords;
    text(kw, "PointType", &p.point_type);
    kw.push(PvlKeyword::new("PointId", p.id.as_str()));
    text(kw, "ChooserName", &p.chooser_name);
    text(kw, "DateTime", &p.date_time);
    flag(kw, "EditLock", p.edit_lock);
    flag(kw, "Ignore", p.ignore);
    flag(kw, "JigsawRejected", p.jigsaw_rejected);
    if p.apriori_surface_point_source != "None" {
        text(kw, "AprioriXYZSource", &p.apriori_surface_point_source);
    }
    text(kw, "AprioriXYZSourceFile", &p.apriori_surface_point_source_file);
    if p.apriori_radius_source != "None" {
        text(kw, "AprioriRadiusSource", &p.apriori_radius_source);
    }
    text(kw, "AprioriRadiusSourceFile", &p.apriori_radius_source_file);
    surface_keywords(kw, "Apriori", p.apriori.as_ref(), frame);
    surface_keywords(kw, "Adjusted", p.adjusted.as_ref(), frame);

    object.groups = p
        .measures
        .iter()
        .map(|m| measure_group(m, p.reference.as_deref() == Some(m.serial.as_str())))
        .collect();
    object
}

fn measure_group(m: &MeasureEntry, is_reference: bool) -> PvlGroup {
    let mut kw = Vec::new();
    kw.push(PvlKeyword::new("SerialNumber", m.serial.as_str()));
    text(&mut kw, "MeasureType", &m.measure_type);
    text(&mut kw, "ChooserName", &m.chooser_name);
    text(&mut kw, "DateTime", &m.date_time);
    flag(&mut kw, "EditLock", m.edit_lock);
    flag(&mut kw, "Ignore", m.ignore);
    flag(&mut kw, "JigsawRejected", m.jigsaw_rejected);
    optional(&mut kw, "Sample", m.sample, None);
    optional(&mut kw, "Line", m.line, None);
    optional(&mut kw, "AprioriSample", m.apriori_sample, None);
    optional(&mut kw, "AprioriLine", m.apriori_line, None);
    optional(&mut kw, "SampleSigma", m.sample_sigma, Some("pixels"));
    optional(&mut kw, "LineSigma", m.line_sigma, Some("pixels"));
    optional(&mut kw, "Diameter", m.diameter, None);
    optional(&mut kw, "SampleResidual", m.sample_residual, Some("pixels"));
    optional(&mut kw, "LineResidual", m.line_residual, Some("pixels"));
    for record in &m.log {
        kw.push(PvlKeyword::new(&record.name, number(record.value)));
    }
    flag(&mut kw, "Reference", is_reference);
    PvlGroup { name: "ControlMeasure".into(), keywords: kw }
}

// ----------------------------------------------------------------------------
// Reading
// ----------------------------------------------------------------------------

/// Keyword lookup that remembers what it handed out, for unknown-keyword
/// warnings.
struct Fields<'k> {
    owner: String,
    keywords: &'k [PvlKeyword],
    used: Vec<bool>,
}

impl<'k> Fields<'k> {
    fn new(owner: String, keywords: &'k [PvlKeyword]) -> Self {
        Self { owner, keywords, used: vec![false; keywords.len()] }
    }

    fn get(&mut self, name: &str) -> Option<&'k PvlKeyword> {
        let i = self.keywords.iter().position(|k| k.name.eq_ignore_ascii_case(name))?;
        self.used[i] = true;
        Some(&self.keywords[i])
    }

    fn text(&mut self, name: &str) -> String {
        self.get(name).and_then(PvlKeyword::first).unwrap_or_default().to_string()
    }

    fn flag(&mut self, name: &str) -> Result<bool> {
        let Some(value) = self.get(name).and_then(PvlKeyword::first) else {
            return Ok(false);
        };
        if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("no") {
            Ok(false)
        } else {
            Err(self.invalid(name, value))
        }
    }

    fn number(&mut self, name: &str) -> Result<Option<f64>> {
        let Some(value) = self.get(name).and_then(PvlKeyword::first) else {
            return Ok(None);
        };
        value.parse::<f64>().map(Some).map_err(|_| self.invalid(name, value))
    }

    fn numbers<const N: usize>(&mut self, name: &str) -> Result<Option<[f64; N]>> {
        let Some(keyword) = self.get(name) else {
            return Ok(None);
        };
        if keyword.values.len() != N {
            return Err(Error::user(format!(
                "Keyword [{name}] in {} must have {N} values, found {}",
                self.owner,
                keyword.values.len()
            )));
        }
        let mut out = [0.0; N];
        for (slot, value) in out.iter_mut().zip(&keyword.values) {
            *slot = value.parse().map_err(|_| self.invalid(name, value))?;
        }
        Ok(Some(out))
    }

    fn surface(&mut self, prefix: &str, frame: CoordinateType) -> Result<Option<SurfaceEntry>> {
        let mut coordinates = [0.0; 3];
        let mut found = 0;
        for (slot, (suffix, _)) in coordinates.iter_mut().zip(frame_keys(frame)) {
            if let Some(v) = self.number(&format!("{prefix}{suffix}"))? {
                *slot = v;
                found += 1;
            }
        }
        let covariance = self.numbers::<6>(&format!("{prefix}CovarianceMatrix"))?;
        match found {
            0 if covariance.is_none() => Ok(None),
            3 => Ok(Some(SurfaceEntry { coordinates, covariance })),
            _ => Err(Error::user(format!(
                "Incomplete {prefix} {frame} coordinates in {}",
                self.owner
            ))),
        }
    }

    fn invalid(&self, name: &str, value: &str) -> Error {
        Error::user(format!("Invalid value [{value}] for keyword [{name}] in {}", self.owner))
    }

    /// Keywords never asked for.
    fn unused(&self) -> impl Iterator<Item = &'k PvlKeyword> + '_ {
        self.keywords.iter().zip(&self.used).filter(|(_, u)| !**u).map(|(k, _)| k)
    }
}

/// Interpret a parsed document as a network.
pub fn from_pvl(root: &PvlObject) -> Result<NetworkFile> {
    let net = root
        .object("ControlNetwork")
        .ok_or_else(|| Error::user("Missing [ControlNetwork] object"))?;

    let mut header = Fields::new("the network header".into(), &net.keywords);
    let frame_name = header.text("CoordinateType");
    let frame = if frame_name.is_empty() {
        CoordinateType::default()
    } else {
        CoordinateType::from_name(&frame_name)
            .ok_or_else(|| header.invalid("CoordinateType", &frame_name))?
    };
    let mut file = NetworkFile {
        network_id: header.text("NetworkId"),
        target_name: header.text("TargetName"),
        user_name: header.text("UserName"),
        created: header.text("Created"),
        modified: header.text("LastModified"),
        description: header.text("Description"),
        coordinate_type: frame.as_str().to_string(),
        points: Vec::with_capacity(net.objects.len()),
    };
    let version = header.text("Version");
    if !version.is_empty() && version != FORMAT_VERSION {
        return Err(header.invalid("Version", &version));
    }
    for k in header.unused() {
        tracing::warn!(keyword = %k.name, "skipping unknown network keyword");
    }

    for object in &net.objects {
        if !object.name.eq_ignore_ascii_case("ControlPoint") {
            tracing::warn!(object = %object.name, "skipping unknown object");
            continue;
        }
        file.points.push(point_entry(object, frame)?);
    }
    Ok(file)
}

fn point_entry(object: &PvlObject, frame: CoordinateType) -> Result<PointEntry> {
    let id = object
        .keyword("PointId")
        .and_then(PvlKeyword::first)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::user("Control point without a PointId"))?
        .to_string();

    let mut f = Fields::new(format!("control point [{id}]"), &object.keywords);
    f.get("PointId");
    let mut entry = PointEntry {
        id: id.clone(),
        point_type: f.text("PointType"),
        chooser_name: f.text("ChooserName"),
        date_time: f.text("DateTime"),
        edit_lock: f.flag("EditLock")?,
        ignore: f.flag("Ignore")?,
        jigsaw_rejected: f.flag("JigsawRejected")?,
        reference: None,
        apriori_surface_point_source: f.text("AprioriXYZSource"),
        apriori_surface_point_source_file: f.text("AprioriXYZSourceFile"),
        apriori_radius_source: f.text("AprioriRadiusSource"),
        apriori_radius_source_file: f.text("AprioriRadiusSourceFile"),
        apriori: f.surface("Apriori", frame)?,
        adjusted: f.surface("Adjusted", frame)?,
        measures: Vec::with_capacity(object.groups.len()),
    };
    for k in f.unused() {
        tracing::warn!(point = %id, keyword = %k.name, "skipping unknown point keyword");
    }

    for group in &object.groups {
        if !group.name.eq_ignore_ascii_case("ControlMeasure") {
            tracing::warn!(point = %id, group = %group.name, "skipping unknown group");
            continue;
        }
        let (measure, is_reference) = measure_entry(group, &id)?;
        if is_reference {
            if entry.reference.is_some() {
                return Err(Error::user(format!(
                    "Control point [{id}] has more than one reference measure"
                )));
            }
            entry.reference = Some(measure.serial.clone());
        }
        entry.measures.push(measure);
    }
    Ok(entry)
}

fn measure_entry(group: &PvlGroup, point_id: &str) -> Result<(MeasureEntry, bool)> {
    let serial = group
        .keyword("SerialNumber")
        .and_then(PvlKeyword::first)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::user(format!("Control measure without a SerialNumber in control point [{point_id}]"))
        })?
        .to_string();

    let mut f = Fields::new(
        format!("control point [{point_id}], measure [{serial}]"),
        &group.keywords,
    );
    f.get("SerialNumber");
    let mut entry = MeasureEntry {
        serial,
        measure_type: f.text("MeasureType"),
        chooser_name: f.text("ChooserName"),
        date_time: f.text("DateTime"),
        edit_lock: f.flag("EditLock")?,
        ignore: f.flag("Ignore")?,
        jigsaw_rejected: f.flag("JigsawRejected")?,
        sample: f.number("Sample")?,
        line: f.number("Line")?,
        apriori_sample: f.number("AprioriSample")?,
        apriori_line: f.number("AprioriLine")?,
        sample_sigma: f.number("SampleSigma")?,
        line_sigma: f.number("LineSigma")?,
        diameter: f.number("Diameter")?,
        sample_residual: f.number("SampleResidual")?,
        line_residual: f.number("LineResidual")?,
        log: Vec::new(),
    };
    let is_reference = f.flag("Reference")?;

    for keyword in group.keywords.iter() {
        let Some(tag) = LogDataType::from_name(&keyword.name) else {
            continue;
        };
        if let Some(value) = f.number(&keyword.name)? {
            entry.log.push(LogRecord { name: tag.as_str().to_string(), value });
        }
    }
    for k in f.unused() {
        tracing::warn!(point = %point_id, serial = %entry.serial, keyword = %k.name, "skipping unknown measure keyword");
    }
    Ok((entry, is_reference))
}

// ============================================================================
// Entry points
// ============================================================================

pub fn to_string(file: &NetworkFile) -> String {
    render(&to_pvl(file))
}

pub fn from_str(text: &str) -> Result<NetworkFile> {
    from_pvl(&parse(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_quotes_units_comments() {
        let tokens = tokenize("A = \"x \\\"y\\\"\" <meters> # note\nB = (1, 2)").unwrap();
        let kinds: Vec<Token> = tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Word("A".into()),
                Token::Equals,
                Token::Quoted("x \"y\"".into()),
                Token::Unit("meters".into()),
                Token::Word("B".into()),
                Token::Equals,
                Token::LParen,
                Token::Word("1".into()),
                Token::Comma,
                Token::Word("2".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("A = \"open\n").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::User);
        assert!(err.message().contains("line 1"));
    }

    #[test]
    fn test_parse_nested_blocks() {
        let doc = parse(
            "object = ControlNetwork\n  NetworkId = n\n  Object = ControlPoint\n    PointId = p0\n    \
             Group = ControlMeasure\n      SerialNumber = A\n    End_Group\n  End_Object\nEnd_Object\nEnd\n",
        )
        .unwrap();
        let net = doc.object("ControlNetwork").unwrap();
        assert_eq!(net.keyword("networkid").unwrap().first(), Some("n"));
        assert_eq!(net.objects[0].groups[0].keyword("SerialNumber").unwrap().first(), Some("A"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("Object = ControlNetwork\n").is_err());
        assert!(parse("Group = G\n Object = O\n End_Object\nEnd_Group\n").is_err());
        assert!(parse("Key\n").is_err());
        assert!(parse("Key = (1, 2\n").is_err());
    }

    #[test]
    fn test_render_aligns_and_quotes() {
        let mut root = PvlObject::new("Root");
        let mut object = PvlObject::new("Thing");
        object.keywords.push(PvlKeyword::new("A", "plain"));
        object.keywords.push(PvlKeyword::new("Longer", "needs quotes").with_unit("m"));
        root.objects.push(object);
        assert_eq!(
            render(&root),
            "Object = Thing\n  A      = plain\n  Longer = \"needs quotes\" <m>\nEnd_Object\nEnd\n"
        );
        assert_eq!(parse(&render(&root)).unwrap(), root);
    }

    #[test]
    fn test_incomplete_coordinates_rejected() {
        let text = "Object = ControlNetwork\n CoordinateType = Rectangular\n Object = ControlPoint\n  \
                    PointId = p0\n  AprioriX = 1.0 <meters>\n End_Object\nEnd_Object\nEnd\n";
        let err = from_str(text).unwrap_err();
        assert!(err.message().contains("Incomplete"));
    }

    #[test]
    fn test_unknown_keywords_are_skipped() {
        let text = "Object = ControlNetwork\n Mystery = 1\n Object = ControlPoint\n PointId = p0\n \
                    Group = ControlMeasure\n SerialNumber = A\n GoodnessOfFit = 0.5\n Whatever = x\n \
                    End_Group\n End_Object\nEnd_Object\nEnd\n";
        let file = from_str(text).unwrap();
        assert_eq!(file.points[0].measures[0].log, vec![LogRecord { name: "GoodnessOfFit".into(), value: 0.5 }]);
    }
}
