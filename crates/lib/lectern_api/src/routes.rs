//! Route paths.

pub const HEALTH: &str = "/api/health";

pub const AUTH_REGISTER: &str = "/api/auth/register";
pub const AUTH_LOGIN: &str = "/api/auth/login";
pub const AUTH_REFRESH: &str = "/api/auth/refresh";
pub const AUTH_LOGOUT: &str = "/api/auth/logout";
pub const AUTH_ME: &str = "/api/auth/me";
pub const AUTH_PASSWORD: &str = "/api/auth/password";

pub const COURSES: &str = "/api/courses";
pub const COURSE: &str = "/api/courses/{id}";
pub const COURSE_MEMBERS: &str = "/api/courses/{id}/members";
pub const COURSE_MEMBERS_ME: &str = "/api/courses/{id}/members/me";
pub const COURSE_MEMBER: &str = "/api/courses/{id}/members/{principal_id}";
pub const COURSE_INVITATIONS: &str = "/api/courses/{id}/invitations";
pub const COURSE_ASSIGNMENTS: &str = "/api/courses/{id}/assignments";
pub const COURSE_ANNOUNCEMENTS: &str = "/api/courses/{id}/announcements";
pub const COURSE_ENROLLMENT_REQUESTS: &str = "/api/courses/{id}/enrollment-requests";

pub const ENROLLMENT_REQUESTS: &str = "/api/enrollment-requests";
pub const ENROLLMENT_REQUESTS_MINE: &str = "/api/enrollment-requests/mine";
pub const ENROLLMENT_REQUEST: &str = "/api/enrollment-requests/{id}";
pub const ENROLLMENT_REQUEST_PROCESS: &str = "/api/enrollment-requests/{id}/process";

pub const ASSIGNMENT: &str = "/api/assignments/{id}";
pub const ASSIGNMENT_SUBMISSIONS: &str = "/api/assignments/{id}/submissions";
pub const SUBMISSION: &str = "/api/submissions/{id}";
pub const SUBMISSION_GRADE: &str = "/api/submissions/{id}/grade";

pub const ANNOUNCEMENT_COMMENTS: &str = "/api/announcements/{id}/comments";
pub const COMMENT: &str = "/api/comments/{id}";

pub const NOTIFICATIONS: &str = "/api/notifications";
pub const NOTIFICATIONS_UNREAD: &str = "/api/notifications/unread";
pub const NOTIFICATIONS_UNREAD_COUNT: &str = "/api/notifications/unread/count";
pub const NOTIFICATIONS_READ_ALL: &str = "/api/notifications/read-all";
pub const NOTIFICATIONS_STREAM: &str = "/api/notifications/stream";
pub const NOTIFICATION: &str = "/api/notifications/{id}";
pub const NOTIFICATION_READ: &str = "/api/notifications/{id}/read";
