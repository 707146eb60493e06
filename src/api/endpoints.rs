//! Endpoint table of the remote backend.

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    Login,
    RefreshToken,
    Logout,
    RegisterUser,
    AddWorker,
    GetSnapshot,
    GetQueue,
    GetStats,
    IssueTicket,
    CallNext,
    StartAttendance,
    ConcludeCurrent,
    RedirectCurrent,
    SetCurrentNote,
    MarkReceived,
    RateTicket,
}

impl Endpoint {
    pub const ALL: [Endpoint; 17] = [
        Endpoint::Health,
        Endpoint::Login,
        Endpoint::RefreshToken,
        Endpoint::Logout,
        Endpoint::RegisterUser,
        Endpoint::AddWorker,
        Endpoint::GetSnapshot,
        Endpoint::GetQueue,
        Endpoint::GetStats,
        Endpoint::IssueTicket,
        Endpoint::CallNext,
        Endpoint::StartAttendance,
        Endpoint::ConcludeCurrent,
        Endpoint::RedirectCurrent,
        Endpoint::SetCurrentNote,
        Endpoint::MarkReceived,
        Endpoint::RateTicket,
    ];

    /// Stable lookup key, e.g. `callNext`.
    pub fn key(&self) -> &'static str {
        match self {
            Endpoint::Health => "health",
            Endpoint::Login => "login",
            Endpoint::RefreshToken => "refreshToken",
            Endpoint::Logout => "logout",
            Endpoint::RegisterUser => "registerUser",
            Endpoint::AddWorker => "addWorker",
            Endpoint::GetSnapshot => "getSnapshot",
            Endpoint::GetQueue => "getQueue",
            Endpoint::GetStats => "getStats",
            Endpoint::IssueTicket => "issueTicket",
            Endpoint::CallNext => "callNext",
            Endpoint::StartAttendance => "startAttendance",
            Endpoint::ConcludeCurrent => "concludeCurrent",
            Endpoint::RedirectCurrent => "redirectCurrent",
            Endpoint::SetCurrentNote => "setCurrentNote",
            Endpoint::MarkReceived => "markReceived",
            Endpoint::RateTicket => "rateTicket",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.key() == key)
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::Health | Endpoint::GetSnapshot | Endpoint::GetQueue | Endpoint::GetStats => {
                HttpMethod::Get
            }
            _ => HttpMethod::Post,
        }
    }

    /// Path relative to the configured base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Health => "/auth/health",
            Endpoint::Login => "/auth/login",
            Endpoint::RefreshToken => "/auth/refresh",
            Endpoint::Logout => "/auth/logout",
            Endpoint::RegisterUser => "/users/register",
            Endpoint::AddWorker => "/workers",
            Endpoint::GetSnapshot => "/realtime/snapshot",
            Endpoint::GetQueue => "/queue",
            Endpoint::GetStats => "/stats",
            Endpoint::IssueTicket => "/tickets",
            Endpoint::CallNext => "/tickets/call-next",
            Endpoint::StartAttendance => "/tickets/start",
            Endpoint::ConcludeCurrent => "/tickets/conclude",
            Endpoint::RedirectCurrent => "/tickets/redirect",
            Endpoint::SetCurrentNote => "/tickets/note",
            Endpoint::MarkReceived => "/tickets/received",
            Endpoint::RateTicket => "/tickets/rate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_key(endpoint.key()), Some(endpoint));
        }
        assert_eq!(Endpoint::from_key("deleteEverything"), None);
    }

    #[test]
    fn test_table_entries() {
        assert_eq!(Endpoint::CallNext.method(), HttpMethod::Post);
        assert_eq!(Endpoint::CallNext.path(), "/tickets/call-next");
        assert_eq!(Endpoint::GetSnapshot.method().as_str(), "GET");
        assert_eq!(Endpoint::GetSnapshot.path(), "/realtime/snapshot");
    }
}
