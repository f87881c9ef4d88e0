use std::fmt;

/// Parameters for opening a connection.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub host: String,
    /// Named instance on `host`, if any.
    pub instance: Option<String>,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl ConnectOptions {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            instance: None,
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Qualifies the host with a named instance.
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        let instance = instance.into();
        self.instance = (!instance.is_empty()).then_some(instance);
        self
    }

    /// Builds the backend connection descriptor.
    ///
    /// The layout is fixed:
    /// `Driver={<driver>};Server=<host>[\<instance>];Database=<db>;User Id=<user>;Password=<password>;`
    pub fn descriptor(&self, driver: &str) -> String {
        let mut server = self.host.clone();
        if let Some(instance) = &self.instance {
            server.push('\\');
            server.push_str(instance);
        }

        let mut out = String::with_capacity(64 + server.len() + self.database.len());
        out.push_str("Driver={");
        out.push_str(driver);
        out.push_str("};");
        for (keyword, value) in [
            ("Server", server.as_str()),
            ("Database", self.database.as_str()),
            ("User Id", self.user.as_str()),
            ("Password", self.password.as_str()),
        ] {
            out.push_str(keyword);
            out.push('=');
            out.push_str(value);
            out.push(';');
        }
        out
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("instance", &self.instance)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Splits a connection descriptor into keyword/value pairs.
///
/// Keywords are returned as written; values wrapped in `{}` are unwrapped
/// and may contain `;`. Empty segments are skipped.
pub fn parse_descriptor(descriptor: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = descriptor;
    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            break;
        };
        let keyword = rest[..eq].trim().to_string();
        let after = &rest[eq + 1..];
        let (value, remaining) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(close) => {
                    let tail = &braced[close + 1..];
                    (braced[..close].to_string(), tail.strip_prefix(';').unwrap_or(tail))
                }
                None => (braced.to_string(), ""),
            }
        } else {
            match after.find(';') {
                Some(semi) => (after[..semi].to_string(), &after[semi + 1..]),
                None => (after.to_string(), ""),
            }
        };
        if !keyword.is_empty() {
            pairs.push((keyword, value));
        }
        rest = remaining.trim_start_matches(';');
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_with_instance() {
        let options = ConnectOptions::new("h", "d", "u", "p").instance("i");
        assert_eq!(
            options.descriptor("ODBC Driver 18 for SQL Server"),
            "Driver={ODBC Driver 18 for SQL Server};Server=h\\i;Database=d;User Id=u;Password=p;"
        );
    }

    #[test]
    fn test_descriptor_without_instance() {
        let options = ConnectOptions::new("db.local", "sales", "app", "s3cret");
        assert_eq!(
            options.descriptor("X"),
            "Driver={X};Server=db.local;Database=sales;User Id=app;Password=s3cret;"
        );
        // an empty instance is the same as none
        assert_eq!(options.clone().instance(""), options);
    }

    #[test]
    fn test_parse_descriptor_round_trip() {
        let options = ConnectOptions::new("h", "d", "u", "p").instance("i");
        let pairs = parse_descriptor(&options.descriptor("Some; Driver"));
        let expected: Vec<(String, String)> = [
            ("Driver", "Some; Driver"),
            ("Server", "h\\i"),
            ("Database", "d"),
            ("User Id", "u"),
            ("Password", "p"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_debug_redacts_password() {
        let options = ConnectOptions::new("h", "d", "u", "hunter2");
        let rendered = format!("{:?}", options);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
