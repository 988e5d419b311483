use crate::extract::StatRecord;

/// Column names, in row order.
pub const HEADER: [&str; 8] = [
    "Timestamp",
    "PacketHash",
    "IfIndex",
    "Length",
    "ContainerName",
    "ContainerID",
    "VethName",
    "Hook",
];

const DELIMITER: char = ',';

/// Returns the header line, terminated by `\n`.
pub fn header_line() -> String {
    let mut line = String::new();
    write_line(&mut line, HEADER);
    line
}

/// Formats one record as a delimited line, terminated by `\n`.
pub fn format_row(record: &StatRecord) -> String {
    let mut line = String::with_capacity(96);
    write_line(
        &mut line,
        [
            record.timestamp.to_string().as_str(),
            record.packet_hash.to_string().as_str(),
            record.if_index.to_string().as_str(),
            record.length.to_string().as_str(),
            &*record.container_name,
            &*record.container_id,
            &*record.veth_name,
            record.hook,
        ],
    );
    line
}

fn write_line<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        write_field(out, field);
    }
    out.push('\n');
}

fn write_field(out: &mut String, field: &str) {
    if !needs_quotes(field) {
        out.push_str(field);
        return;
    }
    out.push('"');
    for c in field.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

fn needs_quotes(field: &str) -> bool {
    if field.is_empty() {
        return false;
    }
    if field == r"\." {
        return true;
    }
    field.contains([DELIMITER, '"', '\r', '\n'])
        || field.chars().next().is_some_and(char::is_whitespace)
}

/// Splits delimited text back into fields, undoing the quoting of [`format_row`].
#[cfg(test)]
pub(crate) fn parse(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (quoted, c) {
            (true, '"') if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            (true, '"') => quoted = false,
            (true, c) => field.push(c),
            (false, '"') => quoted = true,
            (false, DELIMITER) => row.push(std::mem::take(&mut field)),
            (false, '\n') => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            (false, c) => field.push(c),
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(container_name: &str) -> StatRecord {
        StatRecord {
            timestamp: 123456789,
            packet_hash: 42,
            if_index: 11,
            length: 1500,
            container_name: container_name.into(),
            container_id: "aaa111".into(),
            veth_name: "eth0".into(),
            hook: "tc_ingress",
        }
    }

    #[test]
    fn test_header_line() {
        assert_eq!(
            header_line(),
            "Timestamp,PacketHash,IfIndex,Length,ContainerName,ContainerID,VethName,Hook\n"
        );
    }

    #[test]
    fn test_plain_row() {
        assert_eq!(
            format_row(&record("container:/web")),
            "123456789,42,11,1500,container:/web,aaa111,eth0,tc_ingress\n"
        );
    }

    #[test]
    fn test_quotes_only_when_needed() {
        assert_eq!(
            format_row(&record("a,\"b\"")),
            "123456789,42,11,1500,\"a,\"\"b\"\"\",aaa111,eth0,tc_ingress\n"
        );
        assert_eq!(
            format_row(&record(" lead")).split(',').nth(4),
            Some("\" lead\"")
        );
        assert!(format_row(&record("")).contains("1500,,aaa111"));
    }

    #[test]
    fn test_parse_undoes_quoting() {
        let text = format_row(&record("multi\nline, \"quoted\""));
        let rows = parse(&text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][4], "multi\nline, \"quoted\"");
        assert_eq!(rows[0].len(), HEADER.len());
    }
}
