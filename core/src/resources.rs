//! Resource families and endpoint descriptors.

use std::fmt;

use crate::error::ApiError;
use crate::http::HttpMethod;

/// Every collection the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Organisations,
    Persons,
    Placements,
    Duties,
    Groups,
    Programmes,
    StudyPlans,
    Syllabuses,
    SchoolUnitOfferings,
    Activities,
    CalendarEvents,
    Attendances,
    AttendanceEvents,
    AttendanceSchedules,
    AggregatedAttendance,
    Grades,
    Resources,
    Rooms,
    Subscriptions,
    DeletedEntities,
    Log,
    Statistics,
}

impl Resource {
    pub const ALL: [Resource; 22] = [
        Resource::Organisations,
        Resource::Persons,
        Resource::Placements,
        Resource::Duties,
        Resource::Groups,
        Resource::Programmes,
        Resource::StudyPlans,
        Resource::Syllabuses,
        Resource::SchoolUnitOfferings,
        Resource::Activities,
        Resource::CalendarEvents,
        Resource::Attendances,
        Resource::AttendanceEvents,
        Resource::AttendanceSchedules,
        Resource::AggregatedAttendance,
        Resource::Grades,
        Resource::Resources,
        Resource::Rooms,
        Resource::Subscriptions,
        Resource::DeletedEntities,
        Resource::Log,
        Resource::Statistics,
    ];

    /// Collection path segment.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Organisations => "organisations",
            Resource::Persons => "persons",
            Resource::Placements => "placements",
            Resource::Duties => "duties",
            Resource::Groups => "groups",
            Resource::Programmes => "programmes",
            Resource::StudyPlans => "studyplans",
            Resource::Syllabuses => "syllabuses",
            Resource::SchoolUnitOfferings => "schoolUnitOfferings",
            Resource::Activities => "activities",
            Resource::CalendarEvents => "calendarEvents",
            Resource::Attendances => "attendances",
            Resource::AttendanceEvents => "attendanceEvents",
            Resource::AttendanceSchedules => "attendanceSchedules",
            Resource::AggregatedAttendance => "aggregatedAttendance",
            Resource::Grades => "grades",
            Resource::Resources => "resources",
            Resource::Rooms => "rooms",
            Resource::Subscriptions => "subscriptions",
            Resource::DeletedEntities => "deletedEntities",
            Resource::Log => "log",
            Resource::Statistics => "statistics",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.path() == path)
    }

    /// `GET /{collection}`.
    pub fn supports_list(self) -> bool {
        !matches!(self, Resource::Log | Resource::Statistics)
    }

    /// `GET /{collection}/{id}`.
    pub fn supports_get(self) -> bool {
        !matches!(
            self,
            Resource::AggregatedAttendance
                | Resource::DeletedEntities
                | Resource::Log
                | Resource::Statistics
        )
    }

    /// `POST /{collection}/lookup`.
    pub fn supports_lookup(self) -> bool {
        self.supports_get() && self != Resource::Subscriptions
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Method plus relative path, with path parameters already substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
}

impl Endpoint {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn list(resource: Resource) -> Result<Self, ApiError> {
        require(resource, resource.supports_list(), "list")?;
        Ok(Self::new(HttpMethod::Get, resource.path()))
    }

    pub fn by_id(resource: Resource, id: &str) -> Result<Self, ApiError> {
        require(resource, resource.supports_get(), "get by id")?;
        Ok(Self::new(HttpMethod::Get, item_path(resource, id)))
    }

    pub fn lookup(resource: Resource) -> Result<Self, ApiError> {
        require(resource, resource.supports_lookup(), "lookup")?;
        Ok(Self::new(HttpMethod::Post, format!("{}/lookup", resource.path())))
    }

    /// `POST /{collection}`.
    pub fn create(resource: Resource) -> Self {
        Self::new(HttpMethod::Post, resource.path())
    }

    pub fn patch(resource: Resource, id: &str) -> Self {
        Self::new(HttpMethod::Patch, item_path(resource, id))
    }

    pub fn delete(resource: Resource, id: &str) -> Self {
        Self::new(HttpMethod::Delete, item_path(resource, id))
    }
}

fn require(resource: Resource, supported: bool, operation: &'static str) -> Result<(), ApiError> {
    if supported {
        Ok(())
    } else {
        Err(ApiError::Unsupported {
            resource: resource.path(),
            operation,
        })
    }
}

/// The id is encoded as a single path segment.
fn item_path(resource: Resource, id: &str) -> String {
    format!("{}/{}", resource.path(), urlencoding::encode(id))
}
