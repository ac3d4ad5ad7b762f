//! Per-resource filter configuration.
//!
//! Each struct lists the filter keys a resource family recognizes, with the
//! value type the server expects. `ToFilters` flattens a struct into the
//! ordered `Filters` mapping that the dispatcher encodes. Unset fields are
//! left out of the query entirely.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::query::{FilterValue, Filters};

pub trait ToFilters {
    fn to_filters(&self) -> Filters;
}

impl ToFilters for Filters {
    fn to_filters(&self) -> Filters {
        self.clone()
    }
}

/// Inclusive bounds, encoded as `{prefix}.onOrBefore` / `{prefix}.onOrAfter`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bounds<V> {
    pub on_or_before: Option<V>,
    pub on_or_after: Option<V>,
}

impl<V: Clone + Into<FilterValue>> Bounds<V> {
    fn apply(&self, prefix: &str, filters: &mut Filters) {
        filters.set(format!("{prefix}.onOrBefore"), self.on_or_before.clone());
        filters.set(format!("{prefix}.onOrAfter"), self.on_or_after.clone());
    }
}

pub type DateBounds = Bounds<NaiveDate>;
pub type TimeBounds = Bounds<DateTime<FixedOffset>>;

/// `meta.created.*` / `meta.modified.*` filters shared by most families.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaFilter {
    pub created_before: Option<DateTime<FixedOffset>>,
    pub created_after: Option<DateTime<FixedOffset>>,
    pub modified_before: Option<DateTime<FixedOffset>>,
    pub modified_after: Option<DateTime<FixedOffset>>,
}

impl MetaFilter {
    pub fn modified_since(after: DateTime<FixedOffset>) -> Self {
        Self {
            modified_after: Some(after),
            ..Self::default()
        }
    }
}

impl ToFilters for MetaFilter {
    fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        filters.set("meta.created.before", self.created_before);
        filters.set("meta.created.after", self.created_after);
        filters.set("meta.modified.before", self.modified_before);
        filters.set("meta.modified.after", self.modified_after);
        filters
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganisationFilter {
    pub parent: Vec<String>,
    pub school_unit_code: Vec<String>,
    pub organisation_code: Vec<String>,
    pub organisation_type: Vec<String>,
    pub school_types: Vec<String>,
    pub start_date: DateBounds,
    pub end_date: DateBounds,
    pub meta: MetaFilter,
    pub expand_reference_names: Option<bool>,
}

impl ToFilters for OrganisationFilter {
    fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        filters.set_list("parent", &self.parent);
        filters.set_list("schoolUnitCode", &self.school_unit_code);
        filters.set_list("organisationCode", &self.organisation_code);
        filters.set_list("type", &self.organisation_type);
        filters.set_list("schoolTypes", &self.school_types);
        self.start_date.apply("startDate", &mut filters);
        self.end_date.apply("endDate", &mut filters);
        filters.extend(self.meta.to_filters());
        filters.set("expandReferenceNames", self.expand_reference_names);
        filters
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    pub name_contains: Vec<String>,
    pub civic_no: Option<String>,
    pub edu_person_principal_name: Option<String>,
    pub identifier_value: Option<String>,
    pub identifier_context: Option<String>,
    pub relationship_entity_type: Option<String>,
    pub relationship_organisation: Option<String>,
    pub relationship_start_date: DateBounds,
    pub relationship_end_date: DateBounds,
    pub meta: MetaFilter,
    pub expand: Vec<String>,
    pub expand_reference_names: Option<bool>,
}

impl ToFilters for PersonFilter {
    fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        filters.set_list("nameContains", &self.name_contains);
        filters.set("civicNo", self.civic_no.clone());
        filters.set("eduPersonPrincipalName", self.edu_person_principal_name.clone());
        filters.set("identifier.value", self.identifier_value.clone());
        filters.set("identifier.context", self.identifier_context.clone());
        filters.set("relationship.entity.type", self.relationship_entity_type.clone());
        filters.set("relationship.organisation", self.relationship_organisation.clone());
        self.relationship_start_date
            .apply("relationship.startDate", &mut filters);
        self.relationship_end_date
            .apply("relationship.endDate", &mut filters);
        filters.extend(self.meta.to_filters());
        filters.set_list("expand", &self.expand);
        filters.set("expandReferenceNames", self.expand_reference_names);
        filters
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFilter {
    pub group_type: Vec<String>,
    pub school_types: Vec<String>,
    pub organisation: Vec<String>,
    pub start_date: DateBounds,
    pub end_date: DateBounds,
    pub meta: MetaFilter,
    pub expand: Vec<String>,
    pub expand_reference_names: Option<bool>,
}

impl ToFilters for GroupFilter {
    fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        filters.set_list("groupType", &self.group_type);
        filters.set_list("schoolTypes", &self.school_types);
        filters.set_list("organisation", &self.organisation);
        self.start_date.apply("startDate", &mut filters);
        self.end_date.apply("endDate", &mut filters);
        filters.extend(self.meta.to_filters());
        filters.set_list("expand", &self.expand);
        filters.set("expandReferenceNames", self.expand_reference_names);
        filters
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub member: Option<String>,
    pub teacher: Option<String>,
    pub organisation: Option<String>,
    pub group: Option<String>,
    pub start_date: DateBounds,
    pub end_date: DateBounds,
    pub meta: MetaFilter,
    pub expand: Vec<String>,
    pub expand_reference_names: Option<bool>,
}

impl ToFilters for ActivityFilter {
    fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        filters.set("member", self.member.clone());
        filters.set("teacher", self.teacher.clone());
        filters.set("organisation", self.organisation.clone());
        filters.set("group", self.group.clone());
        self.start_date.apply("startDate", &mut filters);
        self.end_date.apply("endDate", &mut filters);
        filters.extend(self.meta.to_filters());
        filters.set_list("expand", &self.expand);
        filters.set("expandReferenceNames", self.expand_reference_names);
        filters
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarEventFilter {
    pub start_time: TimeBounds,
    pub end_time: TimeBounds,
    pub activity: Option<String>,
    pub student: Option<String>,
    pub teacher: Option<String>,
    pub organisation: Option<String>,
    pub group: Option<String>,
    pub meta: MetaFilter,
    pub expand_reference_names: Option<bool>,
}

impl ToFilters for CalendarEventFilter {
    fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        self.start_time.apply("startTime", &mut filters);
        self.end_time.apply("endTime", &mut filters);
        filters.set("activity", self.activity.clone());
        filters.set("student", self.student.clone());
        filters.set("teacher", self.teacher.clone());
        filters.set("organisation", self.organisation.clone());
        filters.set("group", self.group.clone());
        filters.extend(self.meta.to_filters());
        filters.set("expandReferenceNames", self.expand_reference_names);
        filters
    }
}

/// Filters for `GET /deletedEntities`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedEntitiesFilter {
    pub after: Option<DateTime<FixedOffset>>,
    /// Entity type names, e.g. `Person`, `Organisation`.
    pub entities: Vec<String>,
}

impl ToFilters for DeletedEntitiesFilter {
    fn to_filters(&self) -> Filters {
        let mut filters = Filters::new();
        filters.set("after", self.after);
        filters.set_list("entities", &self.entities);
        filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn default_filters_encode_to_nothing() {
        assert!(OrganisationFilter::default().to_filters().to_params().is_empty());
        assert!(PersonFilter::default().to_filters().to_params().is_empty());
        assert!(GroupFilter::default().to_filters().to_params().is_empty());
        assert!(ActivityFilter::default().to_filters().to_params().is_empty());
        assert!(CalendarEventFilter::default().to_filters().to_params().is_empty());
        assert!(DeletedEntitiesFilter::default().to_filters().to_params().is_empty());
    }

    #[test]
    fn organisation_filter_covers_lists_dates_and_flags() {
        let filter = OrganisationFilter {
            parent: vec!["p1".to_string(), "p2".to_string()],
            organisation_type: vec!["Skolenhet".to_string()],
            start_date: DateBounds {
                on_or_after: NaiveDate::from_ymd_opt(2024, 8, 1),
                on_or_before: None,
            },
            expand_reference_names: Some(true),
            ..Default::default()
        };
        assert_eq!(
            filter.to_filters().to_params().encode(),
            "parent=p1&parent=p2&type=Skolenhet&startDate.onOrAfter=2024-08-01&expandReferenceNames=true"
        );
    }

    #[test]
    fn person_filter_uses_dotted_keys() {
        let filter = PersonFilter {
            relationship_entity_type: Some("enrolment".to_string()),
            relationship_organisation: Some("org-1".to_string()),
            meta: MetaFilter::modified_since(ts("2024-01-01T00:00:00+00:00")),
            expand: vec!["duties".to_string(), "responsibleFor".to_string()],
            ..Default::default()
        };
        let params = filter.to_filters().to_params();
        let keys: Vec<&str> = params.pairs().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            [
                "relationship.entity.type",
                "relationship.organisation",
                "meta.modified.after",
                "expand",
                "expand"
            ]
        );
        assert_eq!(
            params.values("meta.modified.after").collect::<Vec<_>>(),
            ["2024-01-01T00:00:00+00:00"]
        );
    }

    #[test]
    fn calendar_event_times_are_timestamps() {
        let filter = CalendarEventFilter {
            start_time: TimeBounds {
                on_or_after: Some(ts("2024-09-02T08:00:00+02:00")),
                on_or_before: Some(ts("2024-09-06T17:00:00+02:00")),
            },
            teacher: Some("t-9".to_string()),
            ..Default::default()
        };
        let params = filter.to_filters().to_params();
        assert_eq!(
            params.values("startTime.onOrBefore").collect::<Vec<_>>(),
            ["2024-09-06T17:00:00+02:00"]
        );
        assert_eq!(params.pairs()[0].0, "startTime.onOrBefore");
        assert_eq!(params.values("teacher").collect::<Vec<_>>(), ["t-9"]);
    }

    #[test]
    fn deleted_entities_filter() {
        let filter = DeletedEntitiesFilter {
            after: Some(ts("2024-05-01T12:00:00+00:00")),
            entities: vec!["Person".to_string(), "Group".to_string()],
        };
        assert_eq!(
            filter.to_filters().to_params().encode(),
            "after=2024-05-01T12%3A00%3A00%2B00%3A00&entities=Person&entities=Group"
        );
    }
}
